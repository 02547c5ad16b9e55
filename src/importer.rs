//! 从本地目录构建内容树
//!
//! - 每个子目录成为一个节点，目录中的 `index.html` 作为该节点自身的内容
//! - 每个 `.html` / `.htm` 文件成为一个节点，url 为文件的绝对路径
//! - 标题依次取 `<title>`、第一个标题元素、文件名
//! - 不含任何 HTML 文件的目录被忽略
//!
//! 文件字节按 `<meta charset>` 声明解码，默认 UTF-8。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bundle::{Bundle, NodeInput, Position};
use crate::core::{BundleError, BundleResult};
use crate::parsers::html::{get_charset, get_first_heading, get_title, html_to_dom, serialize_fragment};

const HTML_EXTENSIONS: &[&str] = &["html", "htm"];
const INDEX_FILE_STEM: &str = "index";

/// 导入目录，返回顶层节点的 id
pub fn import_directory(bundle: &mut Bundle, root: &Path) -> BundleResult<Vec<String>> {
    if !root.is_dir() {
        return Err(BundleError::InvalidInput(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let root = root.canonicalize()?;
    let ids = import_entries(bundle, &root, &root)?;
    info!("Imported {} top-level node(s) from {}", ids.len(), root.display());
    Ok(ids)
}

fn import_entries(bundle: &mut Bundle, root: &Path, directory: &Path) -> BundleResult<Vec<String>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .collect();
    entries.sort();

    let mut ids = Vec::new();
    for path in entries {
        let position = ids.len() as i64;
        if path.is_dir() {
            if let Some(id) = import_folder(bundle, root, &path, position)? {
                ids.push(id);
            }
        } else if is_html_file(&path) && !(directory != root && is_index_file(&path)) {
            ids.push(import_file(bundle, root, &path, position)?);
        }
    }

    Ok(ids)
}

fn import_folder(
    bundle: &mut Bundle,
    root: &Path,
    directory: &Path,
    position: i64,
) -> BundleResult<Option<String>> {
    let index_file = HTML_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{}.{}", INDEX_FILE_STEM, extension)))
        .find(|path| path.is_file());

    let children = import_entries(bundle, root, directory)?;
    if children.is_empty() && index_file.is_none() {
        debug!("Skipping {} (no HTML files)", directory.display());
        return Ok(None);
    }

    let title = directory
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut input = NodeInput::new()
        .id(claim_identifier(bundle, directory, path_identifier(root, directory)))
        .title(title)
        .index(position);

    if let Some(index_file) = index_file {
        let page = read_page(&index_file)?;
        input = input.url(page.url).content(page.content);
        if let Some(page_title) = page.title {
            input = input.title(page_title);
        }
    }

    let id = bundle.upsert(input)?;
    for child in &children {
        bundle.add_child(&id, child, Position::End)?;
    }

    Ok(Some(id))
}

fn import_file(bundle: &mut Bundle, root: &Path, path: &Path, position: i64) -> BundleResult<String> {
    let page = read_page(path)?;
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    let id = claim_identifier(bundle, path, path_identifier(root, &path.with_extension("")));
    bundle.upsert(
        NodeInput::new()
            .id(id)
            .title(page.title.unwrap_or(stem))
            .url(page.url)
            .content(page.content)
            .index(position),
    )
}

struct Page {
    url: String,
    title: Option<String>,
    content: String,
}

fn read_page(path: &Path) -> BundleResult<Page> {
    let data = fs::read(path)?;
    let mut dom = html_to_dom(&data, "utf-8");
    if let Some(charset) = get_charset(&dom.document) {
        if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("utf8") {
            dom = html_to_dom(&data, &charset);
        }
    }

    let title = get_title(&dom.document).or_else(|| get_first_heading(&dom.document));

    Ok(Page {
        url: path.to_string_lossy().to_string(),
        title,
        content: serialize_fragment(&dom),
    })
}

fn is_html_file(path: &Path) -> bool {
    path.extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|extension| HTML_EXTENSIONS.contains(&extension.as_str()))
}

fn is_index_file(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem.to_string_lossy().eq_ignore_ascii_case(INDEX_FILE_STEM))
}

/// 由相对路径生成节点 id，分隔符等字符替换为下划线
fn path_identifier(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 不同路径可能生成相同的 id（`a/b.html` 与 `a_b.html`、`a.htm` 与 `a.html`），后来者加后缀
fn claim_identifier(bundle: &Bundle, path: &Path, id: String) -> String {
    let free = bundle.free_id(&id);
    if free != id {
        warn!(
            "Identifier {} of {} is already taken, using {}",
            id,
            path.display(),
            free
        );
    }
    free
}
