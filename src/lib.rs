//! # Guru Bundle
//!
//! 将任意结构的 HTML 内容树编译为 Guru 集合导入包的工具库。
//!
//! ## 模块组织
//!
//! - `core` - 配置、错误类型与共享常量
//! - `env` - 环境变量访问
//! - `parsers` - HTML 规范化、选择器与样式过滤
//! - `bundle` - 节点图、类型确定、资源解析与打包
//! - `network` - 默认资源下载器与上传接口
//! - `importer` - 从本地目录导入
//! - `utils` - URL 与标识符工具函数

pub mod bundle;
pub mod core;
pub mod env;
pub mod importer;
pub mod network;
pub mod parsers;
pub mod utils;

// Re-export commonly used items for convenience
pub use crate::bundle::{
    Bundle, CompileHooks, CompileReport, DownloadOutcome, Node, NodeInput, NodeKind, Position,
    ResourceDownloader,
};
pub use crate::core::{BundleError, BundleOptions, BundleResult};
pub use crate::importer::import_directory;
pub use crate::network::{GuruClient, HttpDownloader};
pub use crate::parsers::normalize_html;
