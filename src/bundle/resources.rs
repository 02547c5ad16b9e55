//! 资源解析
//!
//! 遍历每张卡片 HTML 中的 `src` / `href` 引用：
//!
//! - 指向其他节点的链接改写为 `cards/<id>` 或 `folders/<id>`
//! - 提供了下载回调时，远程资源下载到 `resources/<资源 id>`
//! - 没有下载回调时，本地文档引用的本地文件直接复制
//! - 其余情况改写为绝对地址
//!
//! 同一资源 id 在一次编译中最多下载或复制一次。

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use markup5ever_rcdom::Handle;
use tracing::debug;

use super::log::RunLog;
use super::node::{Node, NodeKind};
use super::{Bundle, CompileHooks};
use crate::parsers::html::dom::{
    descendant_elements, detach, fragment_to_dom, get_body, get_node_attr, is_element,
    set_node_attr, unwrap_element,
};
use crate::parsers::html::serializer::serialize_children;
use crate::utils::url::{
    is_local_path, is_remote_url, is_skipped_reference, local_path_from, resolve_url, resource_id,
};

/// 资源在输出目录中的子目录
pub const RESOURCE_DIR: &str = "resources";

/// 下载回调的结果：布尔值，或 `(状态码, 字节数)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Done(bool),
    Status { code: u16, size: u64 },
}

impl DownloadOutcome {
    /// 2xx 状态码或 `true` 视为成功
    pub fn is_success(&self) -> bool {
        match self {
            DownloadOutcome::Done(done) => *done,
            DownloadOutcome::Status { code, .. } => (200..300).contains(code),
        }
    }
}

impl From<bool> for DownloadOutcome {
    fn from(done: bool) -> Self {
        DownloadOutcome::Done(done)
    }
}

impl From<(u16, u64)> for DownloadOutcome {
    fn from((code, size): (u16, u64)) -> Self {
        DownloadOutcome::Status { code, size }
    }
}

/// 资源下载协作者
///
/// 参数依次为绝对地址、目标文件路径、所属的 bundle 与卡片节点。
pub trait ResourceDownloader {
    fn download(&mut self, url: &str, local_path: &Path, bundle: &Bundle, node: &Node)
        -> DownloadOutcome;
}

impl<F, R> ResourceDownloader for F
where
    F: FnMut(&str, &Path, &Bundle, &Node) -> R,
    R: Into<DownloadOutcome>,
{
    fn download(
        &mut self,
        url: &str,
        local_path: &Path,
        bundle: &Bundle,
        node: &Node,
    ) -> DownloadOutcome {
        self(url, local_path, bundle, node).into()
    }
}

/// 一个引用的改写结果
#[derive(Debug, Clone)]
enum Rewrite {
    Value(String),
    /// 本地文件复制失败：链接去掉标签，图片与 iframe 整体删除
    Drop,
}

/// 编译期间的资源注册表与日志
struct RunState<'r> {
    run_dir: &'r Path,
    registry: IndexMap<String, String>,
    log: RunLog,
}

impl Bundle {
    pub(crate) fn resolve_resources(&mut self, run_dir: &Path, hooks: &mut CompileHooks<'_>) {
        let documents: Vec<String> = self
            .nodes
            .values()
            .filter(|node| !node.removed && node.is_document() && !node.content.trim().is_empty())
            .map(|node| node.id.clone())
            .collect();

        let mut state = RunState {
            run_dir,
            registry: std::mem::take(&mut self.resources),
            log: std::mem::take(&mut self.log),
        };

        let mut rewritten: Vec<(String, String)> = Vec::with_capacity(documents.len());
        for id in &documents {
            if let Some(node) = self.nodes.get(id) {
                let content = self.resolve_document(node, &mut state, hooks);
                rewritten.push((id.clone(), content));
            }
        }

        self.resources = state.registry;
        self.log = state.log;

        for (id, content) in rewritten {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.content = content;
            }
        }
    }

    fn resolve_document(
        &self,
        node: &Node,
        state: &mut RunState<'_>,
        hooks: &mut CompileHooks<'_>,
    ) -> String {
        let dom = fragment_to_dom(&node.content);
        let Some(body) = get_body(&dom) else {
            return node.content.clone();
        };

        let mut memo: HashMap<String, Rewrite> = HashMap::new();

        for element in descendant_elements(&body) {
            for attribute in ["src", "href"] {
                let Some(value) = get_node_attr(&element, attribute) else {
                    continue;
                };
                if is_skipped_reference(&value) {
                    continue;
                }

                let rewrite = match memo.get(&value) {
                    Some(previous) => previous.clone(),
                    None => {
                        let rewrite = self.resolve_reference(node, attribute, &value, state, hooks);
                        memo.insert(value.clone(), rewrite.clone());
                        rewrite
                    }
                };

                match rewrite {
                    Rewrite::Value(new_value) => {
                        if new_value != value {
                            set_node_attr(&element, attribute, Some(new_value));
                        }
                    }
                    Rewrite::Drop => drop_reference(&element, attribute),
                }
            }
        }

        serialize_children(&body)
    }

    fn resolve_reference(
        &self,
        node: &Node,
        attribute: &str,
        value: &str,
        state: &mut RunState<'_>,
        hooks: &mut CompileHooks<'_>,
    ) -> Rewrite {
        let absolute = resolve_url(&node.url, value);

        if attribute == "href" {
            if let Some(target) = self.find_link_target(&absolute, hooks) {
                debug!("Link {} in {} points to {}", absolute, node.id, target);
                return Rewrite::Value(target);
            }
        }

        let remote = is_remote_url(&absolute);
        let local = !remote && is_local_path(&absolute);
        if !remote && !local {
            return Rewrite::Value(absolute);
        }

        let id = resource_id(&absolute);
        let relative = format!("{}/{}", RESOURCE_DIR, id);

        if let Some(downloader) = hooks.downloader.as_deref_mut() {
            if let Some(existing) = state.registry.get(&id) {
                return Rewrite::Value(existing.clone());
            }

            let local_path = state.run_dir.join(&relative);
            let outcome = downloader.download(&absolute, &local_path, self, node);
            let mut fields = vec![
                ("node", node.id.clone()),
                ("url", absolute.clone()),
                ("path", relative.clone()),
            ];
            if let DownloadOutcome::Status { code, size } = outcome {
                fields.push(("status", code.to_string()));
                fields.push(("size", size.to_string()));
            }

            return if outcome.is_success() {
                state.log.info("Resource downloaded", &fields);
                state.registry.insert(id, relative.clone());
                Rewrite::Value(relative)
            } else {
                state.log.warn("Resource download failed, kept external url", &fields);
                Rewrite::Value(absolute)
            };
        }

        let document_is_local = !node.url.is_empty() && is_local_path(&node.url);
        if !(document_is_local && local) {
            return Rewrite::Value(absolute);
        }

        if let Some(existing) = state.registry.get(&id) {
            return Rewrite::Value(existing.clone());
        }

        let source = local_path_from(&absolute);
        let destination = state.run_dir.join(&relative);
        match std::fs::copy(&source, &destination) {
            Ok(size) => {
                state.log.info(
                    "Resource copied",
                    &[
                        ("node", node.id.clone()),
                        ("url", absolute.clone()),
                        ("path", relative.clone()),
                        ("size", size.to_string()),
                    ],
                );
                state.registry.insert(id, relative.clone());
                Rewrite::Value(relative)
            }
            Err(error) => {
                state.log.warn(
                    "Resource copy failed, reference dropped",
                    &[
                        ("node", node.id.clone()),
                        ("url", absolute.clone()),
                        ("error", error.to_string()),
                    ],
                );
                Rewrite::Drop
            }
        }
    }

    /// 地址指向的节点在输出中的路径
    fn find_link_target(&self, absolute: &str, hooks: &CompileHooks<'_>) -> Option<String> {
        let target = self.nodes.values().filter(|n| !n.removed).find(|&candidate| {
            candidate.matches_url(absolute)
                || hooks
                    .link_matcher
                    .is_some_and(|matcher| matcher(candidate, absolute))
        })?;

        let kind = target.kind.unwrap_or(NodeKind::Document);
        Some(format!("{}/{}", kind.directory(), target.id))
    }
}

fn drop_reference(element: &Handle, attribute: &str) {
    if is_element(element, &["a"]) {
        unwrap_element(element);
    } else if is_element(element, &["img", "iframe"]) {
        detach(element);
    } else {
        set_node_attr(element, attribute, None);
    }
}
