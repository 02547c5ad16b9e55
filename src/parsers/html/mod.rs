//! HTML 解析和处理模块
//!
//! - `dom`: 基础 DOM 操作与树变换
//! - `serializer`: 序列化功能
//! - `utils`: 常量与占位标记
//! - `normalizer`: 面向目标编辑器的规范化规则
//! - `selector`: 拆分节点时使用的选择器子集
//! - `metadata`: 标题与字符编码提取

pub mod dom;
pub mod metadata;
pub mod normalizer;
pub mod selector;
pub mod serializer;
pub mod utils;

pub use dom::{fragment_to_dom, get_body, get_node_attr, get_node_name, html_to_dom, set_node_attr};
pub use metadata::{get_charset, get_first_heading, get_title};
pub use normalizer::{is_blank_html, normalize_html};
pub use selector::Selector;
pub use serializer::{serialize_children, serialize_fragment};
