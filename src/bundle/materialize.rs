//! 类型确定与结构物化

use std::collections::HashMap;

use tracing::debug;

use super::graph::Position;
use super::node::{NodeInput, NodeKind};
use super::Bundle;
use crate::core::{BundleResult, UNORDERED_INDEX};
use crate::parsers::html::is_blank_html;

/// 文件夹自带内容时生成的卡片 id 后缀
pub const CONTENT_SUFFIX: &str = "_content";

impl Bundle {
    /// 按显式索引对每个节点的子节点稳定排序
    pub(crate) fn sort_children(&mut self) {
        let indexes: HashMap<String, i64> = self
            .nodes
            .values()
            .map(|node| (node.id.clone(), node.index))
            .collect();

        for node in self.nodes.values_mut() {
            node.children
                .sort_by_key(|child| indexes.get(child).copied().unwrap_or(UNORDERED_INDEX));
        }
    }

    /// 从根节点开始先序遍历，确定每个节点的类型
    ///
    /// 节点出现在多个父节点下时每条路径都会检查；任一路径超出最大深度，整棵子树都会被丢弃。
    pub(crate) fn assign_kinds(&mut self) {
        let roots: Vec<String> = self.roots().iter().map(|node| node.id.clone()).collect();
        for root in roots {
            self.assign_kind(&root, 0);
        }
    }

    fn assign_kind(&mut self, id: &str, depth: usize) {
        let Some(node) = self.nodes.get(id).filter(|node| !node.removed) else {
            return;
        };
        let explicit_kind = node.explicit_kind;
        let children: Vec<String> = node
            .children
            .iter()
            .filter(|child| self.nodes.get(*child).is_some_and(|c| !c.removed))
            .cloned()
            .collect();

        if children.is_empty() {
            let kind = match explicit_kind {
                Some(NodeKind::Container) => NodeKind::Container,
                _ => NodeKind::Document,
            };
            if let Some(node) = self.nodes.get_mut(id) {
                node.kind = Some(kind);
            }
            return;
        }

        if depth >= self.options().max_depth {
            self.log.warn(
                "Maximum depth exceeded, subtree discarded",
                &[("node", id.to_string()), ("depth", (depth + 1).to_string())],
            );
            // 节点已确认存在
            let _ = self.remove_cascading(id);
            return;
        }

        if explicit_kind == Some(NodeKind::Document) {
            self.log.info(
                "Node has children, kind changed to container",
                &[("node", id.to_string())],
            );
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.kind = Some(NodeKind::Container);
        }

        for child in children {
            self.assign_kind(&child, depth + 1);
        }
    }

    /// 为带有自身内容的文件夹生成内容卡片，放在第一个子节点的位置
    pub(crate) fn insert_nodes(&mut self) -> BundleResult<()> {
        let targets: Vec<String> = self
            .nodes
            .values()
            .filter(|node| !node.removed && node.is_container() && !is_blank_html(&node.content))
            .map(|node| node.id.clone())
            .collect();

        for id in targets {
            let preferred = format!("{}{}", id, CONTENT_SUFFIX);
            let content_id = self.free_id(&preferred);
            if content_id != preferred {
                self.log.info(
                    "Content card id taken, suffix added",
                    &[("node", id.clone()), ("id", content_id.clone())],
                );
            }

            let Some(container) = self.nodes.get_mut(&id) else {
                continue;
            };
            let url = std::mem::take(&mut container.url);
            let content = std::mem::take(&mut container.content);
            let alt_urls = std::mem::take(&mut container.alt_urls);
            let title = container.title.clone();
            let tags = container.tags.clone();

            let mut input = NodeInput::new()
                .id(content_id)
                .title(title)
                .url(url)
                .content(content)
                .tags(tags)
                .skip_normalize();
            input.alt_urls = alt_urls;

            let content_id = self.upsert(input)?;
            self.add_child(&id, &content_id, Position::First)?;
            if let Some(content_node) = self.nodes.get_mut(&content_id) {
                content_node.kind = Some(NodeKind::Document);
            }
            debug!("Inserted content card {} into {}", content_id, id);
        }

        Ok(())
    }

    /// 反复删除空文件夹和空卡片，直到不再变化
    pub(crate) fn prune_empty(&mut self) {
        loop {
            let empty: Vec<String> = self
                .nodes
                .values()
                .filter(|node| !node.removed)
                .filter(|node| match node.kind {
                    Some(NodeKind::Container) => !node
                        .children
                        .iter()
                        .any(|child| self.nodes.get(child).is_some_and(|c| !c.removed)),
                    Some(NodeKind::Document) => is_blank_html(&node.content),
                    None => false,
                })
                .map(|node| node.id.clone())
                .collect();

            if empty.is_empty() {
                break;
            }

            for id in empty {
                self.log.info("Empty node skipped", &[("node", id.clone())]);
                let _ = self.remove_cascading(&id);
            }
        }
    }

    /// 从注册表中清除所有已移除的节点
    pub(crate) fn sweep_removed(&mut self) {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| !node.removed);
        if before != self.nodes.len() {
            debug!("Dropped {} removed node(s)", before - self.nodes.len());
        }
    }
}
