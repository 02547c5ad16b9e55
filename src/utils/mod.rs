//! # 工具模块
//!
//! 这个模块包含各种工具函数和实用程序：
//!
//! - URL 与本地路径的解析
//! - 资源内容寻址（MD5 + 扩展名）
//! - 节点标识清理
//!
//! # 模块组织
//!
//! - `url` - URL处理、路径解析、内容寻址等工具函数

pub mod url;

// Re-export commonly used items for convenience
pub use url::{
    clean_identifier, identifier_from_url, is_local_path, is_remote_url, is_skipped_reference,
    local_path_from, resolve_url, resource_id, Url,
};
