//! URL 与路径工具
//!
//! 节点的来源既可能是远程页面（`http(s)://`），也可能是本地文件路径，
//! 本模块负责在两者之间统一处理：
//!
//! - 相对引用的解析（远程用 `Url::join`，本地用路径拼接）
//! - 协议相对地址（`//host/...`）补全为 `https:`
//! - 资源内容寻址：绝对 URL 的 MD5 加上最多 4 个字符的扩展名
//! - 节点标识清理

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use percent_encoding::percent_decode_str;
pub use url::Url;

/// 资源扩展名允许的最大长度
pub const MAX_EXTENSION_LEN: usize = 4;

/// 是否为不需要处理的引用（data、mailto、页内锚点）
pub fn is_skipped_reference(value: &str) -> bool {
    let value = value.trim();
    let has_scheme = |scheme: &str| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    };
    value.is_empty() || value.starts_with('#') || has_scheme("data:") || has_scheme("mailto:")
}

/// 是否为带协议的远程地址
pub fn is_remote_url(value: &str) -> bool {
    let lowercased = value.trim_start().to_ascii_lowercase();
    lowercased.starts_with("http://") || lowercased.starts_with("https://")
}

/// 是否为协议相对地址（`//host/path`）
pub fn is_protocol_relative(value: &str) -> bool {
    value.starts_with("//")
}

/// 是否指向本地文件系统
///
/// `file://` 地址、绝对路径以及不带协议的相对路径都视为本地路径。
pub fn is_local_path(value: &str) -> bool {
    if value.is_empty() || is_remote_url(value) || is_protocol_relative(value) {
        return false;
    }
    if value.starts_with("file://") {
        return true;
    }
    // Windows drive letters look like a scheme to the URL parser
    let bytes = value.as_bytes();
    if bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }
    Url::parse(value).is_err()
}

/// 将本地引用转换为文件系统路径
///
/// 去掉 `file://` 前缀、查询串和片段，并做百分号解码。
pub fn local_path_from(value: &str) -> PathBuf {
    let without_scheme = value.strip_prefix("file://").unwrap_or(value);
    let without_suffix = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let decoded = percent_decode_str(without_suffix).decode_utf8_lossy();
    PathBuf::from(decoded.as_ref())
}

/// 相对于文档地址解析引用，得到绝对地址
///
/// - 文档地址为远程 URL 时使用标准的 URL 合并规则
/// - 文档地址为本地路径时，相对引用按文档所在目录拼接
/// - 文档地址为空时原样返回（仅补全协议相对地址）
pub fn resolve_url(document_url: &str, target: &str) -> String {
    let target = target.trim();

    if is_protocol_relative(target) {
        return format!("https:{}", target);
    }
    if is_remote_url(target) || target.starts_with("file://") {
        return target.to_string();
    }
    if document_url.is_empty() {
        return target.to_string();
    }

    if is_remote_url(document_url) {
        return match Url::parse(document_url).and_then(|base| base.join(target)) {
            Ok(joined) => joined.to_string(),
            Err(_) => target.to_string(),
        };
    }

    if is_local_path(target) {
        let target_path = local_path_from(target);
        if target_path.is_absolute() {
            return target_path.to_string_lossy().to_string();
        }
        let base = local_path_from(document_url);
        let dir = base.parent().unwrap_or_else(|| Path::new(""));
        return normalize_path(&dir.join(target_path))
            .to_string_lossy()
            .to_string();
    }

    target.to_string()
}

/// 折叠路径中的 `.` 与 `..`，不访问文件系统
pub fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// 去掉 URL 中的片段部分
pub fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// 计算字符串的 MD5 十六进制摘要
pub fn md5_hex(value: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 提取查询串之前最多 4 个字符的文件扩展名
pub fn file_extension(url: &str) -> Option<String> {
    let parsed_path;
    let path = match Url::parse(url) {
        Ok(parsed) if is_remote_url(url) => {
            parsed_path = parsed.path().to_string();
            parsed_path.as_str()
        }
        _ => url.split(['?', '#']).next().unwrap_or(url),
    };
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, extension) = file_name.rsplit_once('.')?;

    if stem.is_empty()
        || extension.is_empty()
        || extension.len() > MAX_EXTENSION_LEN
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    Some(extension.to_string())
}

/// 资源内容地址：绝对 URL 的 MD5，保留扩展名
pub fn resource_id(absolute_url: &str) -> String {
    let hash = md5_hex(absolute_url);
    match file_extension(absolute_url) {
        Some(extension) => format!("{}.{}", hash, extension),
        None => hash,
    }
}

/// 清理节点标识，仅保留字母、数字、下划线和连字符
pub fn clean_identifier(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// 由来源地址派生节点标识
pub fn identifier_from_url(url: &str) -> String {
    md5_hex(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_references() {
        assert!(is_skipped_reference("data:image/png;base64,AAAA"));
        assert!(is_skipped_reference("MAILTO:someone@example.com"));
        assert!(is_skipped_reference("#section"));
        assert!(is_skipped_reference("  "));
        assert!(!is_skipped_reference("image.png"));
        assert!(!is_skipped_reference("https://example.com/a.png"));
    }

    #[test]
    fn test_local_path_detection() {
        assert!(is_local_path("/tmp/docs/page.html"));
        assert!(is_local_path("images/logo.png"));
        assert!(is_local_path("file:///tmp/a.png"));
        assert!(is_local_path("C:\\docs\\page.html"));
        assert!(!is_local_path("https://example.com/"));
        assert!(!is_local_path("//cdn.example.com/a.png"));
        assert!(!is_local_path(""));
    }

    #[test]
    fn test_resolve_remote() {
        assert_eq!(
            resolve_url("https://example.com/docs/page.html", "img/a.png"),
            "https://example.com/docs/img/a.png"
        );
        assert_eq!(
            resolve_url("https://example.com/docs/page.html", "/root.png"),
            "https://example.com/root.png"
        );
    }

    #[test]
    fn test_resolve_protocol_relative() {
        assert_eq!(
            resolve_url("", "//cdn.example.com/x.js"),
            "https://cdn.example.com/x.js"
        );
    }

    #[test]
    fn test_resolve_local() {
        assert_eq!(
            resolve_url("/tmp/docs/guide/page.html", "../img/a%20b.png"),
            "/tmp/docs/img/a b.png"
        );
        assert_eq!(resolve_url("", "img/a.png"), "img/a.png");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(
            file_extension("https://example.com/a/photo.jpeg?size=2"),
            Some("jpeg".to_string())
        );
        assert_eq!(file_extension("https://example.com/a/archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("https://example.com/a/page.phtml5x"), None);
        assert_eq!(file_extension("https://example.com/a/"), None);
        assert_eq!(file_extension("https://example.com/.hidden"), None);
        assert_eq!(file_extension("https://example.com"), None);
    }

    #[test]
    fn test_resource_id() {
        let id = resource_id("https://example.com/logo.png?v=3");
        assert!(id.ends_with(".png"));
        assert_eq!(id.len(), 32 + 4);
        assert_eq!(id, resource_id("https://example.com/logo.png?v=3"));
        assert_ne!(id, resource_id("https://example.com/logo.png?v=4"));
    }

    #[test]
    fn test_clean_identifier() {
        assert_eq!(clean_identifier("getting started/intro.md"), "gettingstartedintromd");
        assert_eq!(clean_identifier("node_1-a"), "node_1-a");
    }
}
