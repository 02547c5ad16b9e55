//! 按选择器拆分节点内容
//!
//! 在每个切分点之前插入占位文本，序列化后按占位文本切开字符串，
//! 每一段再经过一次规范化，未闭合的标签由解析器补全。

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tracing::debug;

use super::graph::Position;
use super::node::NodeInput;
use super::Bundle;
use crate::core::{truncate_title, BundleError, BundleResult};
use crate::parsers::html::dom::{
    ancestors, child_elements, create_text, descendant_elements, detach, fragment_to_dom, get_body,
    insert_before, is_element, text_content,
};
use crate::parsers::html::normalize_html;
use crate::parsers::html::serializer::serialize_children;
use crate::parsers::html::utils::HEADING_TAGS;
use crate::parsers::html::Selector;

const SPLIT_MARKER_PREFIX: &str = "[[guru-split:";

impl Bundle {
    /// 按给定的 `(选择器, 标题)` 列表拆分节点
    ///
    /// 每个选择器取上一个切分点之后的第一个匹配；没有匹配或无法解析的选择器被跳过。
    /// 第一段保留在原节点，其余各段成为紧随其后的兄弟节点，返回新节点的 id。
    pub fn split(&mut self, id: &str, splits: &[(&str, &str)]) -> BundleResult<Vec<String>> {
        let content = self.content_of(id)?;
        let dom = fragment_to_dom(&content);
        let Some(body) = get_body(&dom) else {
            return Ok(vec![]);
        };

        let elements = descendant_elements(&body);
        let mut cuts: Vec<(Handle, String)> = Vec::new();
        let mut next_position = 0;

        for (selector, title) in splits {
            let Some(selector) = Selector::parse(selector) else {
                continue;
            };
            let found = selector
                .matching_positions(&content, &elements)
                .into_iter()
                .find(|position| *position >= next_position);
            if let Some(position) = found {
                cuts.push((elements[position].clone(), title.to_string()));
                next_position = position + 1;
            }
        }

        self.apply_cuts(id, &body, cuts, false)
    }

    /// 在选择器的每个匹配处拆分，新节点的标题取自匹配元素的文本
    ///
    /// `nest` 为真时新节点作为原节点的子节点，否则作为兄弟节点。
    pub fn split_all(&mut self, id: &str, selector: &str, nest: bool) -> BundleResult<Vec<String>> {
        let content = self.content_of(id)?;
        let Some(selector) = Selector::parse(selector) else {
            return Ok(vec![]);
        };
        let dom = fragment_to_dom(&content);
        let Some(body) = get_body(&dom) else {
            return Ok(vec![]);
        };

        let matched = selector.select(&content, &descendant_elements(&body));
        let cuts: Vec<(Handle, String)> = matched
            .iter()
            .filter(|element| {
                !ancestors(element)
                    .iter()
                    .any(|ancestor| matched.iter().any(|m| Rc::ptr_eq(m, ancestor)))
            })
            .map(|element| (element.clone(), collapse_whitespace(&text_content(element))))
            .collect();

        self.apply_cuts(id, &body, cuts, nest)
    }

    fn content_of(&self, id: &str) -> BundleResult<String> {
        self.node(id)
            .map(|node| node.content.clone())
            .ok_or_else(|| BundleError::NodeNotFound(id.to_string()))
    }

    fn apply_cuts(
        &mut self,
        id: &str,
        body: &Handle,
        cuts: Vec<(Handle, String)>,
        nest: bool,
    ) -> BundleResult<Vec<String>> {
        if cuts.is_empty() {
            return Ok(vec![]);
        }

        let marker = unused_marker(&serialize_children(body));
        for (element, _) in &cuts {
            insert_before(element, &create_text(&marker));
        }
        let html = serialize_children(body);
        let mut pieces = html.split(marker.as_str());
        let first = pieces.next().unwrap_or_default();

        let Some(node) = self.nodes.get_mut(id) else {
            return Err(BundleError::NodeNotFound(id.to_string()));
        };
        node.content = normalize_html(first);
        let (url, tags, index, parents, base_title) = (
            node.url.clone(),
            node.tags.clone(),
            node.index,
            node.parents.clone(),
            node.display_title().to_string(),
        );

        let mut created = Vec::new();
        let mut previous = id.to_string();

        for (number, (piece, (_, title))) in pieces.zip(cuts.iter()).enumerate() {
            let part = number + 1;
            let title = if title.trim().is_empty() {
                format!("{} ({})", base_title, part + 1)
            } else {
                truncate_title(title)
            };
            let content = strip_leading_heading(&normalize_html(piece), &title);

            let mut input = NodeInput::new()
                .id(format!("{}_part{}", id, part))
                .title(title.as_str())
                .url(url.as_str())
                .content(content)
                .tags(tags.iter().cloned())
                .index(index)
                .skip_normalize();
            if url.is_empty() {
                input.url = None;
            }
            let part_id = self.upsert(input)?;

            if nest {
                self.add_child(id, &part_id, Position::End)?;
            } else if parents.is_empty() {
                if let (Some(from), Some(after)) = (
                    self.nodes.get_index_of(&part_id),
                    self.nodes.get_index_of(&previous),
                ) {
                    let to = if from > after { after + 1 } else { after };
                    self.nodes.move_index(from, to);
                }
            } else {
                for parent in &parents {
                    self.add_child(parent, &part_id, Position::After(previous.clone()))?;
                }
            }

            previous = part_id.clone();
            created.push(part_id);
        }

        debug!("Split {} into {} additional node(s)", id, created.len());
        Ok(created)
    }
}

/// 内容中尚未出现过的切分标记
fn unused_marker(html: &str) -> String {
    (0u32..)
        .map(|nonce| format!("{}{}]]", SPLIT_MARKER_PREFIX, nonce))
        .find(|marker| !html.contains(marker.as_str()))
        .unwrap_or_else(|| format!("{}x]]", SPLIT_MARKER_PREFIX))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// 片段开头的标题与给定标题相同时将其去掉
fn strip_leading_heading(html: &str, title: &str) -> String {
    let dom = fragment_to_dom(html);
    let Some(body) = get_body(&dom) else {
        return html.to_string();
    };
    let Some(first) = child_elements(&body).into_iter().next() else {
        return html.to_string();
    };

    let leading_text = body
        .children
        .borrow()
        .iter()
        .take_while(|child| !Rc::ptr_eq(child, &first))
        .map(text_content)
        .collect::<String>();
    if !leading_text.trim().is_empty() || !is_element(&first, HEADING_TAGS) {
        return html.to_string();
    }

    if collapse_whitespace(&text_content(&first)) != collapse_whitespace(title) {
        return html.to_string();
    }

    detach(&first);
    normalize_html(&serialize_children(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_marker_avoids_existing_text() {
        assert_eq!(unused_marker("<p>x</p>"), "[[guru-split:0]]");
        assert_eq!(
            unused_marker("<p>[[guru-split:0]] [[guru-split:1]]</p>"),
            "[[guru-split:2]]"
        );
    }

    #[test]
    fn test_strip_leading_heading() {
        assert_eq!(strip_leading_heading("<h2>T</h2><p>B</p>", "T"), "<p>B</p>");
        assert_eq!(
            strip_leading_heading("<h2>Other</h2><p>B</p>", "T"),
            "<h2>Other</h2><p>B</p>"
        );
        assert_eq!(
            strip_leading_heading("text<h2>T</h2>", "T"),
            "text<h2>T</h2>"
        );
    }
}
