//! 输出目录与压缩包
//!
//! 目录结构：
//!
//! ```text
//! <run_dir>/
//!   collection.yaml
//!   folders/<id>.yaml
//!   cards/<id>.yaml
//!   cards/<id>.html
//!   resources/<资源 id>
//!   collection_<run-id>.zip
//!   log_<run-id>.csv
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::node::{Node, NodeKind};
use super::resources::RESOURCE_DIR;
use super::Bundle;
use crate::core::BundleResult;

pub const MANIFEST_FILE: &str = "collection.yaml";
pub const PREVIEW_FILE: &str = "index.html";

/// 跟在 `<` 之后的零宽空格，防止标题被当作标签
const ZERO_WIDTH_SPACE: char = '\u{200B}';

#[derive(Debug, Serialize)]
struct Item {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Type")]
    item_type: &'static str,
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "Items", skip_serializing_if = "Option::is_none")]
    items: Option<Vec<Item>>,
}

#[derive(Debug, Serialize)]
struct CardRecord {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "ExternalId")]
    external_id: String,
    #[serde(rename = "ExternalUrl", skip_serializing_if = "Option::is_none")]
    external_url: Option<String>,
    #[serde(rename = "Tags", skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FolderRecord {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "ExternalId")]
    external_id: String,
    #[serde(rename = "ExternalUrl", skip_serializing_if = "Option::is_none")]
    external_url: Option<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "Items")]
    items: Vec<Item>,
}

#[derive(Debug, Serialize)]
struct Manifest {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Tags")]
    tags: Vec<String>,
    #[serde(rename = "Items")]
    items: Vec<Item>,
}

/// 标题转义：`<` 后插入零宽空格
pub fn escape_title(title: &str) -> String {
    let mut escaped = String::with_capacity(title.len());
    for c in title.chars() {
        escaped.push(c);
        if c == '<' {
            escaped.push(ZERO_WIDTH_SPACE);
        }
    }
    escaped
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// 准备输出目录
pub(crate) fn prepare_run_dir(run_dir: &Path, clear: bool) -> BundleResult<()> {
    if clear && run_dir.exists() {
        debug!("Clearing {}", run_dir.display());
        fs::remove_dir_all(run_dir)?;
    }

    for directory in [
        NodeKind::Container.directory(),
        NodeKind::Document.directory(),
        RESOURCE_DIR,
    ] {
        fs::create_dir_all(run_dir.join(directory))?;
    }

    Ok(())
}

/// 写出全部元数据与内容文件并打包，返回压缩包路径
pub(crate) fn write_bundle(bundle: &mut Bundle, run_dir: &Path, run_id: &str) -> BundleResult<PathBuf> {
    let mut tags: IndexSet<String> = IndexSet::new();
    let mut root_documents = Vec::new();

    for node in bundle.nodes.values().filter(|n| !n.removed) {
        match node.kind {
            Some(NodeKind::Document) => {
                write_card(run_dir, node)?;
                tags.extend(node.tags.iter().cloned());
                if node.is_root() {
                    root_documents.push(node.id.clone());
                }
            }
            Some(NodeKind::Container) => write_folder(bundle, run_dir, node)?,
            None => {}
        }
    }

    for id in root_documents {
        bundle.log.warn(
            "Card has no folder and is not listed in the collection",
            &[("node", id)],
        );
    }

    let manifest = Manifest {
        title: escape_title(
            bundle
                .options()
                .collection_title
                .as_deref()
                .unwrap_or(bundle.id()),
        ),
        tags: tags.into_iter().collect(),
        items: bundle
            .roots()
            .into_iter()
            .filter(|node| node.is_container())
            .map(|node| Item {
                id: node.id.clone(),
                item_type: NodeKind::Container.item_type(),
                title: Some(escape_title(node.display_title())),
                items: None,
            })
            .collect(),
    };
    fs::write(run_dir.join(MANIFEST_FILE), serde_yaml::to_string(&manifest)?)?;

    let missing: Vec<String> = bundle
        .resources
        .values()
        .filter(|relative| !run_dir.join(relative.as_str()).is_file())
        .cloned()
        .collect();
    for relative in missing {
        bundle
            .log
            .warn("Registered resource missing from output", &[("path", relative)]);
    }

    if bundle.options().write_preview {
        fs::write(run_dir.join(PREVIEW_FILE), render_preview(bundle))?;
    }

    let archive_path = run_dir.join(format!("collection_{}.zip", run_id));
    let count = write_archive(run_dir, &archive_path)?;
    info!("Packed {} file(s) into {}", count, archive_path.display());

    Ok(archive_path)
}

fn write_card(run_dir: &Path, node: &Node) -> BundleResult<()> {
    let directory = run_dir.join(NodeKind::Document.directory());
    let record = CardRecord {
        title: escape_title(node.display_title()),
        external_id: node.id.clone(),
        external_url: non_empty(&node.url),
        tags: node.tags.clone(),
    };

    fs::write(
        directory.join(format!("{}.yaml", node.id)),
        serde_yaml::to_string(&record)?,
    )?;
    fs::write(directory.join(format!("{}.html", node.id)), &node.content)?;
    Ok(())
}

fn write_folder(bundle: &Bundle, run_dir: &Path, node: &Node) -> BundleResult<()> {
    let record = FolderRecord {
        title: escape_title(node.display_title()),
        external_id: node.id.clone(),
        external_url: non_empty(&node.url),
        description: non_empty(&node.description),
        items: folder_items(bundle, node),
    };

    fs::write(
        run_dir
            .join(NodeKind::Container.directory())
            .join(format!("{}.yaml", node.id)),
        serde_yaml::to_string(&record)?,
    )?;
    Ok(())
}

/// 文件夹的直接子项，子文件夹递归嵌入自己的子项
fn folder_items(bundle: &Bundle, node: &Node) -> Vec<Item> {
    node.children
        .iter()
        .filter_map(|child| bundle.nodes.get(child))
        .filter(|child| !child.removed)
        .filter_map(|child| match child.kind? {
            NodeKind::Document => Some(Item {
                id: child.id.clone(),
                item_type: NodeKind::Document.item_type(),
                title: None,
                items: None,
            }),
            NodeKind::Container => Some(Item {
                id: child.id.clone(),
                item_type: NodeKind::Container.item_type(),
                title: Some(escape_title(child.display_title())),
                items: Some(folder_items(bundle, child)),
            }),
        })
        .collect()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 按树的顺序列出所有卡片的浏览页
fn render_preview(bundle: &Bundle) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let title = bundle
        .options()
        .collection_title
        .clone()
        .unwrap_or_else(|| bundle.id().to_string());
    html.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", escape_html(&title)));
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&title)));

    let roots: Vec<&Node> = bundle.roots();
    render_preview_list(bundle, &roots, &mut html);

    html.push_str("</body>\n</html>\n");
    html
}

fn render_preview_list(bundle: &Bundle, nodes: &[&Node], html: &mut String) {
    if nodes.is_empty() {
        return;
    }

    html.push_str("<ul>\n");
    for node in nodes {
        match node.kind {
            Some(NodeKind::Document) => html.push_str(&format!(
                "<li><a href=\"cards/{}.html\">{}</a></li>\n",
                node.id,
                escape_html(node.display_title())
            )),
            Some(NodeKind::Container) => {
                html.push_str(&format!("<li>{}\n", escape_html(node.display_title())));
                let children: Vec<&Node> = node
                    .children
                    .iter()
                    .filter_map(|child| bundle.nodes.get(child))
                    .filter(|child| !child.removed)
                    .collect();
                render_preview_list(bundle, &children, html);
                html.push_str("</li>\n");
            }
            None => {}
        }
    }
    html.push_str("</ul>\n");
}

/// 输出目录中需要打包的文件（相对路径，按字典序）
fn archive_entries(run_dir: &Path) -> BundleResult<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    let mut pending = vec![run_dir.to_path_buf()];

    while let Some(directory) = pending.pop() {
        for entry in fs::read_dir(&directory)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }

            let Ok(relative) = path.strip_prefix(run_dir) else {
                continue;
            };
            let name = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<String>>()
                .join("/");

            let at_top = relative.components().count() == 1;
            let excluded = at_top
                && (name == PREVIEW_FILE
                    || name.ends_with(".zip")
                    || (name.starts_with("log_") && name.ends_with(".csv")));
            if !excluded {
                entries.push((name, path));
            }
        }
    }

    entries.sort();
    Ok(entries)
}

fn write_archive(run_dir: &Path, archive_path: &Path) -> BundleResult<usize> {
    let entries = archive_entries(run_dir)?;
    let file = File::create(archive_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&fs::read(path)?)?;
    }
    zip.finish()?;

    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_title() {
        assert_eq!(escape_title("a < b"), "a <\u{200B} b");
        assert_eq!(escape_title("plain"), "plain");
    }

    #[test]
    fn test_archive_entries_skip_run_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        prepare_run_dir(dir.path(), true).unwrap();
        fs::write(dir.path().join("collection.yaml"), "Title: x\n").unwrap();
        fs::write(dir.path().join("cards").join("a.html"), "A").unwrap();
        fs::write(dir.path().join("collection_1.zip"), "").unwrap();
        fs::write(dir.path().join("log_1.csv"), "").unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();

        let names: Vec<String> = archive_entries(dir.path())
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["cards/a.html", "collection.yaml"]);
    }
}
