use serde::Serialize;

use crate::core::{truncate_title, UNORDERED_INDEX};

/// 节点在编译后的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// 文件夹，只包含有序的子节点
    Container,
    /// 卡片，持有一份 HTML 内容
    Document,
}

impl NodeKind {
    /// 输出目录名
    pub fn directory(&self) -> &'static str {
        match self {
            NodeKind::Container => "folders",
            NodeKind::Document => "cards",
        }
    }

    /// 元数据中 `Type` 字段的取值
    pub fn item_type(&self) -> &'static str {
        match self {
            NodeKind::Container => "folder",
            NodeKind::Document => "card",
        }
    }
}

/// 内容树中的一个节点
///
/// 节点由 [`Bundle`](super::Bundle) 统一持有，父子关系以 id 记录在两端。
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub title: String,
    pub url: String,
    /// 仅用于匹配交叉引用的其他地址
    pub alt_urls: Vec<String>,
    pub content: String,
    pub description: String,
    pub tags: Vec<String>,
    pub index: i64,
    /// 编译时才确定，之前为 `None`
    pub kind: Option<NodeKind>,
    /// 调用方指定的类型
    pub explicit_kind: Option<NodeKind>,
    pub(crate) children: Vec<String>,
    pub(crate) parents: Vec<String>,
    pub(crate) removed: bool,
}

impl Node {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            title: String::new(),
            url: String::new(),
            alt_urls: vec![],
            content: String::new(),
            description: String::new(),
            tags: vec![],
            index: UNORDERED_INDEX,
            kind: None,
            explicit_kind: None,
            children: vec![],
            parents: vec![],
            removed: false,
        }
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_container(&self) -> bool {
        self.kind == Some(NodeKind::Container)
    }

    pub fn is_document(&self) -> bool {
        self.kind == Some(NodeKind::Document)
    }

    /// 展示用标题，未设置时退回 id
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }

    /// 地址（含备用地址）是否与给定地址相同
    pub fn matches_url(&self, url: &str) -> bool {
        let url = crate::utils::url::strip_fragment(url);
        if url.is_empty() {
            return false;
        }

        std::iter::once(&self.url)
            .chain(self.alt_urls.iter())
            .filter(|candidate| !candidate.is_empty())
            .any(|candidate| crate::utils::url::strip_fragment(candidate) == url)
    }
}

/// 新建或更新节点时提供的字段
///
/// 只有非空字段会覆盖已有节点上的值。
///
/// ```rust
/// use guru_bundle::bundle::{NodeInput, NodeKind};
///
/// let input = NodeInput::new()
///     .id("getting-started")
///     .title("Getting started")
///     .content("<p>Hello</p>")
///     .tag("onboarding")
///     .kind(NodeKind::Document);
/// assert_eq!(input.id.as_deref(), Some("getting-started"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodeInput {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub alt_urls: Vec<String>,
    pub index: Option<i64>,
    pub kind: Option<NodeKind>,
    /// 跳过 HTML 规范化，内容按原样保存
    pub skip_normalize: bool,
}

impl NodeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn alt_url(mut self, url: impl Into<String>) -> Self {
        self.alt_urls.push(url.into());
        self
    }

    pub fn index(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn skip_normalize(mut self) -> Self {
        self.skip_normalize = true;
        self
    }

    /// 把非空字段合并到节点上
    pub(crate) fn merge_into(self, node: &mut Node) {
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()) {
            node.title = truncate_title(&title);
        }
        if let Some(url) = self.url.filter(|u| !u.is_empty()) {
            node.url = url;
        }
        if let Some(content) = self.content.filter(|c| !c.trim().is_empty()) {
            node.content = if self.skip_normalize {
                content
            } else {
                crate::parsers::html::normalize_html(&content)
            };
        }
        if let Some(description) = self.description.filter(|d| !d.is_empty()) {
            node.description = description;
        }
        if !self.tags.is_empty() {
            node.tags = dedup_preserving_order(self.tags);
        }
        if !self.alt_urls.is_empty() {
            node.alt_urls = self.alt_urls;
        }
        if let Some(index) = self.index {
            node.index = index;
        }
        if let Some(kind) = self.kind {
            node.explicit_kind = Some(kind);
        }
    }
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_only_overwrites_supplied_fields() {
        let mut node = Node::new("a".to_string());
        NodeInput::new()
            .title("First")
            .url("https://example.com/a")
            .tag("x")
            .merge_into(&mut node);
        NodeInput::new().title("  ").content("").merge_into(&mut node);

        assert_eq!(node.title, "First");
        assert_eq!(node.url, "https://example.com/a");
        assert_eq!(node.tags, vec!["x"]);
        assert_eq!(node.index, UNORDERED_INDEX);
    }

    #[test]
    fn test_merge_normalizes_content() {
        let mut node = Node::new("a".to_string());
        NodeInput::new()
            .content("<p onclick=\"x()\">Hi</p><p></p>")
            .merge_into(&mut node);
        assert_eq!(node.content, "<p>Hi</p>");

        NodeInput::new()
            .content("<p></p>")
            .skip_normalize()
            .merge_into(&mut node);
        assert_eq!(node.content, "<p></p>");
    }

    #[test]
    fn test_tags_are_deduplicated() {
        let mut node = Node::new("a".to_string());
        NodeInput::new()
            .tags(["b", "a", "b", " "])
            .merge_into(&mut node);
        assert_eq!(node.tags, vec!["b", "a"]);
    }

    #[test]
    fn test_matches_url_ignores_fragment() {
        let mut node = Node::new("a".to_string());
        node.url = "https://example.com/page".to_string();
        node.alt_urls = vec!["https://example.com/old".to_string()];
        assert!(node.matches_url("https://example.com/page#intro"));
        assert!(node.matches_url("https://example.com/old"));
        assert!(!node.matches_url("https://example.com/other"));
        assert!(!node.matches_url(""));
    }
}
