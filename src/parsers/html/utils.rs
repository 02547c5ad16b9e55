/// 编辑器接受的属性
pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "style",
    "start",
    "href",
    "target",
    "rel",
    "title",
    "src",
    "alt",
    "height",
    "width",
    "class",
    "data-ghq-card-content-type",
    "data-ghq-card-content-markdown-content",
];

/// 只保留以此前缀开头的 class
pub const PLATFORM_CLASS_PREFIX: &str = "ghq-";

/// Markdown 块容器的 class，其内部样式不做过滤
pub const MARKDOWN_BLOCK_CLASS: &str = "ghq-card-content__markdown";

/// 允许保留的 CSS 属性
pub const ALLOWED_STYLE_PROPERTIES: &[&str] = &[
    "background",
    "background-color",
    "color",
    "font-style",
    "font-weight",
    "text-decoration",
];

/// 去掉标签、保留内容的结构性元素
pub const UNWRAP_TAGS: &[&str] = &["html", "body", "header", "nav", "article"];

/// 连同内容一并删除的元素
pub const REMOVE_TAGS: &[&str] = &[
    "colgroup", "caption", "script", "style", "meta", "title", "head",
];

/// 需要从列表项中提取出来的块级元素
pub const EXTRACTED_BLOCK_TAGS: &[&str] = &["table", "iframe", "pre"];

pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

pub const LIST_TAGS: &[&str] = &["ul", "ol"];

pub const CELL_TAGS: &[&str] = &["td", "th"];

/// 内容为空时会被删除的元素
pub const PRUNABLE_TAGS: &[&str] = &["p", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

/// 判定“空元素”时允许出现的后代标签
pub const EMPTY_TOLERATED_TAGS: &[&str] = &["br", "div", "span"];

/// colspan 展开的上限
pub const MAX_COLSPAN: usize = 64;

const CLOSE_MARKER_PREFIX: &str = "[[guru-close:";
const OPEN_MARKER_PREFIX: &str = "[[guru-open:";
const MARKER_SUFFIX: &str = "]]";

/// 片段中未被占用的标记编号，保证插入的标记不会与原有文本混淆
pub fn marker_nonce(html: &str) -> u32 {
    (0u32..)
        .find(|nonce| {
            !html.contains(&format!("{}{}:", CLOSE_MARKER_PREFIX, nonce))
                && !html.contains(&format!("{}{}:", OPEN_MARKER_PREFIX, nonce))
        })
        .unwrap_or(u32::MAX)
}

/// “在此处关闭标签”的占位文本
pub fn close_marker(nonce: u32, tag: &str) -> String {
    format!("{}{}:{}{}", CLOSE_MARKER_PREFIX, nonce, tag, MARKER_SUFFIX)
}

/// “在此处重新打开标签”的占位文本，有序列表可携带起始编号
pub fn open_marker(nonce: u32, tag: &str, start: Option<i64>) -> String {
    match start {
        Some(start) => format!(
            "{}{}:{}:{}{}",
            OPEN_MARKER_PREFIX, nonce, tag, start, MARKER_SUFFIX
        ),
        None => format!("{}{}:{}{}", OPEN_MARKER_PREFIX, nonce, tag, MARKER_SUFFIX),
    }
}

/// 块级元素在编辑器表格单元格中的行内替代
pub fn inline_replacement(tag: &str) -> Option<&'static str> {
    match tag {
        "p" => Some("span"),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some("strong"),
        "pre" => Some("code"),
        _ => None,
    }
}
