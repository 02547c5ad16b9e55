//! # 网络模块
//!
//! - `session` - 默认的 HTTP 资源下载器
//! - `upload` - 将压缩包上传到集合

pub mod session;
pub mod upload;

pub use session::HttpDownloader;
pub use upload::{Collection, GuruClient};
