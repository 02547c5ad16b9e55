//! 节点图操作
//!
//! 所有节点保存在 [`Bundle`] 的扁平注册表中，子节点列表有序，父节点列表无序。
//! 任何会产生环的连边在修改状态之前就会被拒绝。

use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::debug;

use super::node::{Node, NodeInput};
use super::Bundle;
use crate::core::{BundleError, BundleResult};
use crate::utils::url::{clean_identifier, identifier_from_url};

/// 子节点插入的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    End,
    First,
    /// 紧跟在指定兄弟节点之后；兄弟节点不存在时追加到末尾
    After(String),
}

impl Bundle {
    /// 新建或更新节点，返回节点 id
    ///
    /// id 优先取调用方给定的值（去掉非标识符字符），否则由 url 的哈希生成。
    pub fn upsert(&mut self, input: NodeInput) -> BundleResult<String> {
        let id = input
            .id
            .as_deref()
            .map(clean_identifier)
            .filter(|id| !id.is_empty())
            .or_else(|| {
                input
                    .url
                    .as_deref()
                    .filter(|url| !url.is_empty())
                    .map(identifier_from_url)
            })
            .ok_or(BundleError::MissingIdentity)?;

        if !self.nodes.contains_key(&id) {
            debug!("Creating node {}", id);
            self.nodes.insert(id.clone(), Node::new(id.clone()));
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            input.merge_into(node);
        }

        Ok(id)
    }

    /// 尚未占用的 id：`base` 本身，或依次尝试 `base_2`、`base_3`……
    ///
    /// 已标记移除但尚未清除的节点同样视为占用。
    pub(crate) fn free_id(&self, base: &str) -> String {
        if !self.nodes.contains_key(base) {
            return base.to_string();
        }
        (2u32..)
            .map(|n| format!("{}_{}", base, n))
            .find(|id| !self.nodes.contains_key(id))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// 注册表中的全部节点（含已标记移除的）
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    fn require(&self, id: &str) -> BundleResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| BundleError::NodeNotFound(id.to_string()))
    }

    /// 添加子节点
    ///
    /// 若 `child` 已是 `parent` 的祖先则返回 [`BundleError::Cycle`]，图保持不变；
    /// 已经是直接子节点时什么也不做。
    pub fn add_child(&mut self, parent: &str, child: &str, position: Position) -> BundleResult<()> {
        self.require(parent)?;
        self.require(child)?;

        if parent == child || self.ancestors_of(parent).contains(child) {
            return Err(BundleError::Cycle {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }

        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return Err(BundleError::NodeNotFound(parent.to_string()));
        };
        if parent_node.children.iter().any(|c| c == child) {
            return Ok(());
        }

        let index = match &position {
            Position::End => parent_node.children.len(),
            Position::First => 0,
            Position::After(sibling) => parent_node
                .children
                .iter()
                .position(|c| c == sibling)
                .map(|i| i + 1)
                .unwrap_or(parent_node.children.len()),
        };
        parent_node.children.insert(index, child.to_string());

        if let Some(child_node) = self.nodes.get_mut(child) {
            if !child_node.parents.iter().any(|p| p == parent) {
                child_node.parents.push(parent.to_string());
            }
        }

        Ok(())
    }

    /// 从所有父节点中摘除
    pub fn detach(&mut self, id: &str) -> BundleResult<()> {
        let parents = match self.nodes.get_mut(id) {
            Some(node) => std::mem::take(&mut node.parents),
            None => return Err(BundleError::NodeNotFound(id.to_string())),
        };

        for parent in parents {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|c| c != id);
            }
        }

        Ok(())
    }

    /// 移动到新的父节点下
    pub fn move_to(&mut self, id: &str, new_parent: &str, position: Position) -> BundleResult<()> {
        self.require(new_parent)?;
        if new_parent == id || self.ancestors_of(new_parent).contains(id) {
            return Err(BundleError::Cycle {
                parent: new_parent.to_string(),
                child: id.to_string(),
            });
        }

        self.detach(id)?;
        self.add_child(new_parent, id, position)
    }

    /// 摘除节点并从注册表中删除，原有子节点成为根节点
    pub fn remove(&mut self, id: &str) -> BundleResult<Node> {
        self.detach(id)?;

        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| BundleError::NodeNotFound(id.to_string()))?;

        for child in &node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parents.retain(|p| p != id);
            }
        }

        Ok(node)
    }

    /// 标记节点及其全部后代为已移除，并断开它们的所有连边
    ///
    /// 返回被标记的节点数。
    pub fn remove_cascading(&mut self, id: &str) -> BundleResult<usize> {
        self.require(id)?;

        let mut subtree: IndexSet<String> = IndexSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !subtree.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                stack.extend(node.children.iter().cloned());
            }
        }

        for current in &subtree {
            let (parents, children) = match self.nodes.get_mut(current) {
                Some(node) => {
                    node.removed = true;
                    (
                        std::mem::take(&mut node.parents),
                        std::mem::take(&mut node.children),
                    )
                }
                None => continue,
            };

            for parent in parents {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.retain(|c| c != current);
                }
            }
            for child in children {
                if let Some(child_node) = self.nodes.get_mut(&child) {
                    child_node.parents.retain(|p| p != current);
                }
            }
        }

        debug!("Removed {} node(s) under {}", subtree.len(), id);
        Ok(subtree.len())
    }

    /// 按广度优先展开的全部祖先
    pub fn ancestors_of(&self, id: &str) -> IndexSet<String> {
        let mut found: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        if let Some(node) = self.nodes.get(id) {
            queue.extend(node.parents.iter().cloned());
        }

        while let Some(current) = queue.pop_front() {
            if !found.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                queue.extend(node.parents.iter().cloned());
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BundleOptions;

    fn bundle_with(ids: &[&str]) -> Bundle {
        let mut bundle = Bundle::new("test", BundleOptions::default()).unwrap();
        for id in ids {
            bundle.upsert(NodeInput::new().id(*id).title(*id)).unwrap();
        }
        bundle
    }

    #[test]
    fn test_upsert_derives_id_from_url() {
        let mut bundle = bundle_with(&[]);
        let id = bundle
            .upsert(NodeInput::new().url("https://example.com/a"))
            .unwrap();
        assert_eq!(id.len(), 32);
        assert!(bundle.node(&id).is_some());

        let cleaned = bundle.upsert(NodeInput::new().id("a b/c!")).unwrap();
        assert_eq!(cleaned, "abc");

        assert!(matches!(
            bundle.upsert(NodeInput::new().title("t")),
            Err(BundleError::MissingIdentity)
        ));
    }

    #[test]
    fn test_add_child_positions() {
        let mut bundle = bundle_with(&["p", "a", "b", "c"]);
        bundle.add_child("p", "a", Position::End).unwrap();
        bundle.add_child("p", "b", Position::First).unwrap();
        bundle.add_child("p", "c", Position::After("b".into())).unwrap();
        bundle.add_child("p", "a", Position::First).unwrap();

        assert_eq!(bundle.node("p").unwrap().children(), ["b", "c", "a"]);
        assert_eq!(bundle.node("a").unwrap().parents(), ["p"]);
    }

    #[test]
    fn test_remove_promotes_children_to_roots() {
        let mut bundle = bundle_with(&["p", "c"]);
        bundle.add_child("p", "c", Position::End).unwrap();
        let removed = bundle.remove("p").unwrap();

        assert_eq!(removed.id, "p");
        assert!(bundle.node("p").is_none());
        assert!(bundle.node("c").unwrap().is_root());
    }

    #[test]
    fn test_ancestors_are_breadth_first() {
        let mut bundle = bundle_with(&["root", "left", "right", "leaf"]);
        bundle.add_child("root", "left", Position::End).unwrap();
        bundle.add_child("root", "right", Position::End).unwrap();
        bundle.add_child("left", "leaf", Position::End).unwrap();
        bundle.add_child("right", "leaf", Position::End).unwrap();

        let ancestors: Vec<String> = bundle.ancestors_of("leaf").into_iter().collect();
        assert_eq!(ancestors, vec!["left", "right", "root"]);
    }
}
