//! HTML 规范化
//!
//! 把任意 HTML 片段转换为目标编辑器能够渲染的子集。规则按固定顺序执行：
//!
//! 1. 展开 `colspan`，补足空单元格
//! 2. 属性白名单，class 只保留平台前缀
//! 3. 表格单元格内的 `<li>` 改为 `- ` 文本行
//! 4. 拆掉直接嵌套在列表中的列表
//! 5. 单元格内的块级元素改为行内元素，并以 `<br>` 分隔
//! 6. 拆掉无语义的包装标签，删除不渲染的标签
//! 7. 将列表项中的表格、iframe、pre 提升到列表之外
//! 8. 过滤 `style` 声明
//! 9. 拆掉没有属性的 `<span>`
//! 10. 删除空的段落、列表项和标题
//! 11. 删除没有列表项的列表
//! 12. 字符串层面的收尾处理
//!
//! 第 7 条使用占位文本实现：先在块的前后插入“关闭/重新打开”标记，
//! 序列化后再把标记替换为真实标签并重新解析。标记带有一个片段中未出现过的编号，
//! 原文中形似标记的文本不会被替换。
//!
//! 对已经规范化的输出再次调用 [`normalize_html`]，结果不变。

use std::rc::Rc;
use std::sync::LazyLock;

use html5ever::tendril::StrTendril;
use markup5ever_rcdom::{Handle, NodeData};
use regex::{Captures, Regex};
use tracing::debug;

use super::dom::{
    ancestors, child_elements, create_element, create_text, descendant_elements, descendants,
    detach, element_index_among, following_siblings, fragment_to_dom, get_body, get_node_attr,
    get_node_name, get_parent_node, has_ancestor, has_attributes, insert_after, insert_before,
    is_element, is_whitespace_text, next_element_sibling, rename_element, set_node_attr,
    text_content, unwrap_element,
};
use super::serializer::serialize_children;
use super::utils::{
    close_marker, inline_replacement, marker_nonce, open_marker, ALLOWED_ATTRIBUTES,
    ALLOWED_STYLE_PROPERTIES, CELL_TAGS, EMPTY_TOLERATED_TAGS, EXTRACTED_BLOCK_TAGS, LIST_TAGS,
    MARKDOWN_BLOCK_CLASS, MAX_COLSPAN, PLATFORM_CLASS_PREFIX, PRUNABLE_TAGS, REMOVE_TAGS,
    UNWRAP_TAGS,
};
use crate::parsers::css::filter_style_declarations;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[guru-(close|open):(\d+):([a-z0-9]+)(?::(-?\d+))?\]\]")
        .expect("MARKER: hardcoded regex is valid")
});

static LEADING_EMPTY_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(ol|ul)((?:\s[^>]*)?)>\s*<li>\s*</li>")
        .expect("LEADING_EMPTY_ITEM: hardcoded regex is valid")
});

static TRAILING_EMPTY_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<li>\s*</li>\s*</(ol|ul)>").expect("TRAILING_EMPTY_ITEM: hardcoded regex is valid")
});

/// 规范化 HTML 片段
///
/// 输入可以是完整文档或片段，只有 `<body>` 下的内容会被保留。
pub fn normalize_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    match normalize_body(html) {
        Some(normalized) => normalized,
        None => String::new(),
    }
}

fn normalize_body(html: &str) -> Option<String> {
    let mut dom = fragment_to_dom(html);
    let mut body = get_body(&dom)?;

    expand_colspans(&body);
    filter_attributes(&body);
    flatten_lists_in_cells(&body);
    unwrap_nested_lists(&body);
    inline_cell_blocks(&body);
    strip_wrappers(&body);

    if let Some(rewritten) = extract_list_blocks(&body) {
        dom = fragment_to_dom(&rewritten);
        body = get_body(&dom)?;
    }

    filter_styles(&body);
    unwrap_bare_spans(&body);
    prune_empty(&body);

    Some(finish(&serialize_children(&body)))
}

fn elements_named(root: &Handle, names: &[&str]) -> Vec<Handle> {
    descendant_elements(root)
        .into_iter()
        .filter(|node| is_element(node, names))
        .collect()
}

/// 元素没有可见文本，且后代只有 br、div、span
fn has_no_visible_content(node: &Handle) -> bool {
    text_content(node).trim().is_empty()
        && descendant_elements(node)
            .iter()
            .all(|element| is_element(element, EMPTY_TOLERATED_TAGS))
}

// 1
fn expand_colspans(root: &Handle) {
    for cell in elements_named(root, CELL_TAGS) {
        let Some(colspan) = get_node_attr(&cell, "colspan") else {
            continue;
        };
        set_node_attr(&cell, "colspan", None);

        let span = colspan
            .trim()
            .parse::<usize>()
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        let tag = get_node_name(&cell).unwrap_or("td").to_string();

        let mut anchor = cell.clone();
        for _ in 1..span {
            let filler = create_element(&tag, vec![]);
            insert_after(&anchor, &filler);
            anchor = filler;
        }
    }
}

// 2
fn filter_attributes(root: &Handle) {
    for element in descendant_elements(root) {
        let NodeData::Element { attrs, .. } = &element.data else {
            continue;
        };
        let mut attrs = attrs.borrow_mut();
        attrs.retain(|attr| ALLOWED_ATTRIBUTES.contains(&&*attr.name.local));

        if let Some(position) = attrs.iter().position(|attr| &*attr.name.local == "class") {
            let kept = attrs[position]
                .value
                .split_whitespace()
                .filter(|class| class.starts_with(PLATFORM_CLASS_PREFIX))
                .collect::<Vec<&str>>()
                .join(" ");
            if kept.is_empty() {
                attrs.remove(position);
            } else {
                attrs[position].value = StrTendril::from(kept.as_str());
            }
        }
    }
}

// 3
fn flatten_lists_in_cells(root: &Handle) {
    for cell in elements_named(root, CELL_TAGS) {
        for item in elements_named(&cell, &["li"]) {
            insert_before(&item, &create_element("br", vec![]));
            insert_before(&item, &create_text("- "));
            unwrap_element(&item);
        }
        for list in elements_named(&cell, LIST_TAGS) {
            unwrap_element(&list);
        }
    }
}

// 4
fn unwrap_nested_lists(root: &Handle) {
    for list in elements_named(root, LIST_TAGS) {
        let nested = get_parent_node(&list).is_some_and(|parent| is_element(&parent, LIST_TAGS));
        if nested {
            unwrap_element(&list);
        }
    }
}

// 5
fn inline_cell_blocks(root: &Handle) {
    for cell in elements_named(root, CELL_TAGS) {
        let mut converted: Vec<Handle> = Vec::new();
        for block in descendant_elements(&cell) {
            let Some(replacement) = get_node_name(&block).and_then(inline_replacement) else {
                continue;
            };
            converted.push(rename_element(&block, replacement));
        }

        for element in &converted {
            let Some(next) = next_element_sibling(element) else {
                continue;
            };
            if converted.iter().any(|other| Rc::ptr_eq(other, &next)) {
                insert_after(element, &create_element("br", vec![]));
            }
        }
    }
}

// 6
fn strip_wrappers(root: &Handle) {
    for element in descendant_elements(root) {
        if is_element(&element, REMOVE_TAGS) {
            detach(&element);
        } else if is_element(&element, UNWRAP_TAGS) {
            unwrap_element(&element);
        }
    }
}

// 7
fn extract_list_blocks(root: &Handle) -> Option<String> {
    let nonce = marker_nonce(&serialize_children(root));
    let plans: Vec<(Handle, String, String)> = elements_named(root, EXTRACTED_BLOCK_TAGS)
        .into_iter()
        .filter(|block| has_ancestor(block, &["li"]) && !has_ancestor(block, EXTRACTED_BLOCK_TAGS))
        .filter_map(|block| {
            let (before, after) = extraction_markers(&block, nonce)?;
            Some((block, before, after))
        })
        .collect();

    if plans.is_empty() {
        return None;
    }

    debug!("Extracting {} block(s) out of list items", plans.len());
    for (block, before, after) in &plans {
        insert_before(block, &create_text(before));
        insert_after(block, &create_text(after));
    }

    Some(replace_markers(&serialize_children(root), nonce))
}

/// 计算块前的关闭标记和块后的重新打开标记
///
/// 需要关闭的元素链从块的父元素一直到最外层列表。
fn extraction_markers(block: &Handle, nonce: u32) -> Option<(String, String)> {
    let chain = ancestors(block);
    let top = chain
        .iter()
        .rposition(|element| is_element(element, LIST_TAGS))
        .or_else(|| chain.iter().rposition(|element| is_element(element, &["li"])))?;
    let chain = &chain[..=top];

    let mut before = String::new();
    let mut opens = Vec::with_capacity(chain.len());
    for (position, element) in chain.iter().enumerate() {
        let tag = get_node_name(element)?;
        before.push_str(&close_marker(nonce, tag));

        let start = if tag == "ol" {
            let item = if position == 0 {
                block
            } else {
                &chain[position - 1]
            };
            Some(continuation_start(element, item, block, &chain[..position.saturating_sub(1)]))
        } else {
            None
        };
        opens.push(open_marker(nonce, tag, start));
    }
    opens.reverse();

    Some((before, opens.concat()))
}

/// 重新打开的有序列表的起始编号
///
/// `item` 是 `list` 中包含块的子元素，`between` 是块与 `item` 之间的元素。
/// 若 `item` 在块之后已没有内容，重新打开的空列表项会被删除，编号顺延一位。
fn continuation_start(list: &Handle, item: &Handle, block: &Handle, between: &[Handle]) -> i64 {
    let start = get_node_attr(list, "start")
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(1);
    let index = element_index_among(item, &["li"]) as i64;

    if !is_element(item, &["li"]) || Rc::ptr_eq(item, block) {
        return start + index;
    }

    let rest_is_empty = std::iter::once(block)
        .chain(between.iter())
        .all(|node| following_siblings(node).iter().all(is_blank));

    if rest_is_empty {
        start + index + 1
    } else {
        start + index
    }
}

fn is_blank(node: &Handle) -> bool {
    match node.data {
        NodeData::Text { .. } => is_whitespace_text(node),
        NodeData::Element { .. } => {
            (is_element(node, EMPTY_TOLERATED_TAGS) || is_element(node, PRUNABLE_TAGS))
                && has_no_visible_content(node)
        }
        _ => true,
    }
}

/// 只替换带有本次编号的标记，其余形似标记的文本保持原样
fn replace_markers(html: &str, nonce: u32) -> String {
    let nonce = nonce.to_string();
    MARKER
        .replace_all(html, |caps: &Captures| {
            if caps[2] != nonce {
                return caps[0].to_string();
            }
            match (&caps[1], caps.get(4)) {
                ("close", _) => format!("</{}>", &caps[3]),
                (_, Some(start)) => format!("<{} start=\"{}\">", &caps[3], start.as_str()),
                (_, None) => format!("<{}>", &caps[3]),
            }
        })
        .into_owned()
}

// 8
fn filter_styles(root: &Handle) {
    for element in descendant_elements(root) {
        let Some(style) = get_node_attr(&element, "style") else {
            continue;
        };
        if inside_markdown_block(&element) {
            continue;
        }

        let filtered = filter_style_declarations(&style, ALLOWED_STYLE_PROPERTIES);
        if filtered.is_empty() {
            set_node_attr(&element, "style", None);
        } else {
            set_node_attr(&element, "style", Some(filtered));
        }
    }
}

fn inside_markdown_block(node: &Handle) -> bool {
    ancestors(node).iter().any(|ancestor| {
        get_node_attr(ancestor, "class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == MARKDOWN_BLOCK_CLASS))
    })
}

// 9
fn unwrap_bare_spans(root: &Handle) {
    for span in elements_named(root, &["span"]) {
        if !has_attributes(&span) {
            unwrap_element(&span);
        }
    }
}

// 10, 11：删除列表可能让外层列表项变空，因此重复到不再变化
fn prune_empty(root: &Handle) {
    loop {
        let mut removed = 0;

        for element in descendant_elements(root).into_iter().rev() {
            if is_element(&element, PRUNABLE_TAGS) && has_no_visible_content(&element) {
                detach(&element);
                removed += 1;
            }
        }

        for list in elements_named(root, LIST_TAGS) {
            let has_items = child_elements(&list)
                .iter()
                .any(|child| is_element(child, &["li"]));
            if !has_items {
                detach(&list);
                removed += 1;
            }
        }

        if removed == 0 {
            break;
        }
    }
}

// 12：标记已在第 7 条的重新解析之前替换
fn finish(html: &str) -> String {
    let unescaped = html
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
        .replace("\\'", "'");
    let collapsed = LEADING_EMPTY_ITEM.replace_all(&unescaped, "<$1$2>");
    let collapsed = TRAILING_EMPTY_ITEM.replace_all(&collapsed, "</$1>");

    collapsed.trim().to_string()
}

/// 文档中是否含有需要处理的内容（用于跳过纯空白输入）
pub fn is_blank_html(html: &str) -> bool {
    let dom = fragment_to_dom(html);
    match get_body(&dom) {
        Some(body) => descendants(&body).iter().all(is_blank),
        None => true,
    }
}
