//! # 解析器模块
//!
//! - `html` - HTML 解析、DOM 操作、规范化、选择器
//! - `css` - 内联样式声明的切分与过滤

pub mod css;
pub mod html;

pub use css::filter_style_declarations;
pub use html::{html_to_dom, normalize_html, Selector};
