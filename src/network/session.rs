//! 默认的资源下载器
//!
//! 使用阻塞式 reqwest 客户端逐个下载，超时与重试由调用方决定；
//! 这里只做一次请求并报告状态码与大小。网页（HTML 文档）不作为资源下载，
//! 指向它们的链接保留原地址。

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};

use crate::bundle::{Bundle, DownloadOutcome, Node, ResourceDownloader};
use crate::core::BundleResult;
use crate::utils::url::{is_remote_url, local_path_from};

pub const DEFAULT_USER_AGENT: &str = concat!("guru-bundle/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_MIME_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];
const PAGE_EXTENSIONS: [&str; 3] = ["html", "htm", "xhtml"];

fn is_page_mime(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    PAGE_MIME_TYPES
        .iter()
        .any(|page| mime.eq_ignore_ascii_case(page))
}

fn is_page_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            PAGE_EXTENSIONS
                .iter()
                .any(|page| extension.eq_ignore_ascii_case(page))
        })
}

/// 基于 HTTP 的 [`ResourceDownloader`]
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> BundleResult<Self> {
        Self::with_options(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    pub fn with_options(timeout: Duration, user_agent: &str) -> BundleResult<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// 下载 `url` 并写入 `path`，返回 `(状态码, 字节数)`
    ///
    /// 非 2xx 响应不写文件；本地地址直接复制。
    /// 目标是网页时不写文件并返回 `None`。
    pub fn fetch(&self, url: &str, path: &Path) -> BundleResult<Option<(u16, u64)>> {
        if !is_remote_url(url) {
            let source = local_path_from(url);
            if is_page_path(&source) {
                return Ok(None);
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let size = fs::copy(source, path)?;
            return Ok(Some((200, size)));
        }

        let response = self.client.get(url).send()?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(Some((status, 0)));
        }

        let is_page = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_page_mime);
        if is_page {
            return Ok(None);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = response.bytes()?;
        fs::write(path, &data)?;
        debug!("Fetched {} ({} bytes)", url, data.len());

        Ok(Some((status, data.len() as u64)))
    }
}

impl ResourceDownloader for HttpDownloader {
    fn download(
        &mut self,
        url: &str,
        local_path: &Path,
        _bundle: &Bundle,
        node: &Node,
    ) -> DownloadOutcome {
        match self.fetch(url, local_path) {
            Ok(Some(result)) => result.into(),
            Ok(None) => {
                debug!("Not downloading page {} linked from {}", url, node.id);
                DownloadOutcome::Done(false)
            }
            Err(error) => {
                warn!("Failed to fetch {} for {}: {}", url, node.id, error);
                DownloadOutcome::Done(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::NodeInput;
    use crate::core::BundleOptions;

    #[test]
    fn test_local_files_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("image.png");
        fs::write(&source, [1u8, 2, 3]).unwrap();
        let target = dir.path().join("out").join("copy.png");

        let downloader = HttpDownloader::new().unwrap();
        let result = downloader
            .fetch(&source.to_string_lossy(), &target)
            .unwrap();
        assert_eq!(result, Some((200, 3)));
        assert_eq!(fs::read(&target).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_pages_are_declined() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("other.HTML");
        fs::write(&source, "<p>page</p>").unwrap();
        let target = dir.path().join("out").join("other.html");

        let downloader = HttpDownloader::new().unwrap();
        let result = downloader
            .fetch(&source.to_string_lossy(), &target)
            .unwrap();
        assert_eq!(result, None);
        assert!(!target.exists());
    }

    #[test]
    fn test_page_mime_types() {
        assert!(is_page_mime("text/html"));
        assert!(is_page_mime("Text/HTML; charset=utf-8"));
        assert!(is_page_mime("application/xhtml+xml"));
        assert!(!is_page_mime("image/png"));
        assert!(!is_page_mime("text/plain"));
        assert!(!is_page_path(Path::new("a/b.png")));
        assert!(is_page_path(Path::new("a/b.htm")));
    }

    #[test]
    fn test_missing_local_file_is_a_failed_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = Bundle::new("t", BundleOptions::default()).unwrap();
        let id = bundle.upsert(NodeInput::new().id("card")).unwrap();
        let node = bundle.node(&id).unwrap().clone();

        let mut downloader = HttpDownloader::new().unwrap();
        let outcome = downloader.download(
            &dir.path().join("missing.png").to_string_lossy(),
            &dir.path().join("copy.png"),
            &bundle,
            &node,
        );
        assert!(!outcome.is_success());
    }
}
