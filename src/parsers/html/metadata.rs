//! HTML 文档元数据
//!
//! 导入本地 HTML 文件时需要字符编码和标题；这里只保留这两类信息的提取。

use markup5ever_rcdom::Handle;

use super::dom::{descendant_elements, get_node_attr, get_node_name, text_content};
use super::utils::HEADING_TAGS;

/// 获取文档字符编码
///
/// 支持 `<meta charset="...">` 与
/// `<meta http-equiv="content-type" content="text/html; charset=...">` 两种写法。
pub fn get_charset(node: &Handle) -> Option<String> {
    elements_named(node, "meta").iter().find_map(|meta| {
        get_node_attr(meta, "charset").or_else(|| {
            let is_content_type = get_node_attr(meta, "http-equiv")
                .is_some_and(|value| value.eq_ignore_ascii_case("content-type"));
            if !is_content_type {
                return None;
            }
            charset_from_content_type(&get_node_attr(meta, "content")?)
        })
    })
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .map(str::trim)
        .find_map(|part| part.strip_prefix("charset="))
        .map(|charset| charset.trim_matches('"').to_string())
        .filter(|charset| !charset.is_empty())
}

/// 第一个非空 `<title>` 的文本
pub fn get_title(node: &Handle) -> Option<String> {
    elements_named(node, "title")
        .iter()
        .map(|title| text_content(title).trim().to_string())
        .find(|title| !title.is_empty())
}

/// 文档中第一个非空标题（h1 至 h6）的文本
pub fn get_first_heading(node: &Handle) -> Option<String> {
    descendant_elements(node)
        .iter()
        .filter(|element| get_node_name(element).is_some_and(|name| HEADING_TAGS.contains(&name)))
        .map(|heading| collapse_whitespace(&text_content(heading)))
        .find(|text| !text.is_empty())
}

fn elements_named(node: &Handle, name: &str) -> Vec<Handle> {
    descendant_elements(node)
        .into_iter()
        .filter(|element| get_node_name(element) == Some(name))
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::fragment_to_dom;

    #[test]
    fn test_charset_variants() {
        let dom = fragment_to_dom("<html><head><meta charset=\"gbk\"></head><body></body></html>");
        assert_eq!(get_charset(&dom.document), Some("gbk".to_string()));

        let dom = fragment_to_dom(
            "<head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\"></head>",
        );
        assert_eq!(get_charset(&dom.document), Some("shift_jis".to_string()));
    }

    #[test]
    fn test_title_and_heading() {
        let dom = fragment_to_dom("<title> Page </title><h2>  First\n heading </h2><h1>Second</h1>");
        assert_eq!(get_title(&dom.document), Some("Page".to_string()));
        assert_eq!(get_first_heading(&dom.document), Some("First heading".to_string()));

        let dom = fragment_to_dom("<p>none</p>");
        assert_eq!(get_title(&dom.document), None);
        assert_eq!(get_first_heading(&dom.document), None);
    }
}
