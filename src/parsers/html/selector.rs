//! CSS 选择器
//!
//! 选择器的解析与匹配交给 scraper。片段会被 scraper 再解析一次，
//! 两棵树由同一套 html5ever 树构建规则生成，`<body>` 下的元素按文档顺序一一对应，
//! 因此匹配结果按文档顺序的位置映射回 rcdom 的节点。

use std::collections::HashMap;

use markup5ever_rcdom::Handle;
use scraper::{ElementRef, Html};
use tracing::debug;

use super::dom::get_node_name;

/// 解析后的选择器
#[derive(Debug, Clone)]
pub struct Selector {
    inner: scraper::Selector,
}

impl Selector {
    /// 解析选择器文本，语法错误返回 `None`
    pub fn parse(text: &str) -> Option<Selector> {
        match scraper::Selector::parse(text.trim()) {
            Ok(inner) => Some(Selector { inner }),
            Err(error) => {
                debug!("Ignoring selector '{}': {:?}", text, error);
                None
            }
        }
    }

    /// 匹配元素在 `elements` 中的位置，按文档顺序
    ///
    /// `elements` 必须是 `html` 经 `fragment_to_dom` 解析后 `<body>` 下的全部后代元素。
    pub fn matching_positions(&self, html: &str, elements: &[Handle]) -> Vec<usize> {
        let document = Html::parse_document(html);
        let Some(body) = document
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == "body")
        else {
            return vec![];
        };

        // rcdom 把 <template> 的内容放在树外
        let positions: HashMap<_, usize> = body
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|element| {
                !element
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| ancestor.value().name() == "template")
            })
            .enumerate()
            .map(|(position, element)| (element.id(), position))
            .collect();

        document
            .select(&self.inner)
            .filter_map(|element| {
                let position = *positions.get(&element.id())?;
                let same_tag = elements
                    .get(position)
                    .and_then(get_node_name)
                    .is_some_and(|name| name == element.value().name());
                same_tag.then_some(position)
            })
            .collect()
    }

    /// 匹配的元素，按文档顺序
    pub fn select(&self, html: &str, elements: &[Handle]) -> Vec<Handle> {
        self.matching_positions(html, elements)
            .into_iter()
            .map(|position| elements[position].clone())
            .collect()
    }
}
