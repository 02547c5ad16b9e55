//! 环境变量
//!
//! 每个变量是一个实现 [`EnvVar`] 的零大小类型，负责名称、说明和取值校验。
//! 编译选项只在变量被设置时才覆盖；上传凭据没有默认值。

use std::env;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub type EnvResult<T> = Result<T, EnvError>;

fn invalid(name: &'static str, reason: impl Into<String>) -> EnvError {
    EnvError::Invalid {
        name,
        reason: reason.into(),
    }
}

/// 带类型的环境变量
pub trait EnvVar {
    type Value;

    const NAME: &'static str;
    const HELP: &'static str;

    fn parse(raw: &str) -> EnvResult<Self::Value>;

    /// 未设置时使用的值
    fn fallback() -> Option<Self::Value> {
        None
    }

    /// 已设置则解析，未设置返回 `Ok(None)`
    fn read() -> EnvResult<Option<Self::Value>> {
        match env::var(Self::NAME) {
            Ok(raw) => Self::parse(&raw).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn get() -> EnvResult<Self::Value> {
        match Self::read()? {
            Some(value) => Ok(value),
            None => Self::fallback().ok_or(EnvError::Missing(Self::NAME)),
        }
    }
}

/// 日志
pub mod core {
    use super::*;

    pub struct LogLevel;

    impl EnvVar for LogLevel {
        type Value = String;

        const NAME: &'static str = "GURU_LOG_LEVEL";
        const HELP: &'static str = "tracing level for the CLI (trace, debug, info, warn, error)";

        fn parse(raw: &str) -> EnvResult<String> {
            let level = raw.trim().to_ascii_lowercase();
            if ["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
                Ok(level)
            } else {
                Err(invalid(Self::NAME, format!("unknown level '{}'", raw)))
            }
        }

        fn fallback() -> Option<String> {
            Some("info".to_string())
        }
    }
}

/// 编译选项覆盖
pub mod bundle {
    use super::*;

    pub struct OutputDir;

    impl EnvVar for OutputDir {
        type Value = PathBuf;

        const NAME: &'static str = "GURU_BUNDLE_DIR";
        const HELP: &'static str = "base directory for bundle output";

        fn parse(raw: &str) -> EnvResult<PathBuf> {
            match raw.trim() {
                "" => Err(invalid(Self::NAME, "empty path")),
                path => Ok(PathBuf::from(path)),
            }
        }
    }

    pub struct MaxDepth;

    impl EnvVar for MaxDepth {
        type Value = usize;

        const NAME: &'static str = "GURU_BUNDLE_MAX_DEPTH";
        const HELP: &'static str = "maximum folder nesting depth (1-16)";

        fn parse(raw: &str) -> EnvResult<usize> {
            match raw.trim().parse::<usize>() {
                Ok(depth @ 1..=16) => Ok(depth),
                Ok(depth) => Err(invalid(Self::NAME, format!("{} is outside 1-16", depth))),
                Err(_) => Err(invalid(Self::NAME, format!("'{}' is not a number", raw))),
            }
        }
    }

    pub struct SkipEmpty;

    impl EnvVar for SkipEmpty {
        type Value = bool;

        const NAME: &'static str = "GURU_BUNDLE_SKIP_EMPTY";
        const HELP: &'static str = "drop empty folders and blank cards (true/false)";

        fn parse(raw: &str) -> EnvResult<bool> {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(invalid(Self::NAME, format!("'{}' is not a boolean", raw))),
            }
        }
    }
}

/// 上传凭据
pub mod api {
    use super::*;

    pub struct ApiUrl;

    impl EnvVar for ApiUrl {
        type Value = String;

        const NAME: &'static str = "GURU_API_URL";
        const HELP: &'static str = "REST API base url";

        fn parse(raw: &str) -> EnvResult<String> {
            let url = raw.trim().trim_end_matches('/');
            if crate::utils::url::is_remote_url(url) {
                Ok(url.to_string())
            } else {
                Err(invalid(Self::NAME, "expected an http(s) url"))
            }
        }

        fn fallback() -> Option<String> {
            Some(crate::network::upload::DEFAULT_API_URL.to_string())
        }
    }

    pub struct User;

    impl EnvVar for User {
        type Value = String;

        const NAME: &'static str = "GURU_USER";
        const HELP: &'static str = "email address used for basic auth";

        fn parse(raw: &str) -> EnvResult<String> {
            let user = raw.trim();
            if user.contains('@') {
                Ok(user.to_string())
            } else {
                Err(invalid(Self::NAME, "expected an email address"))
            }
        }
    }

    pub struct Token;

    impl EnvVar for Token {
        type Value = String;

        const NAME: &'static str = "GURU_API_TOKEN";
        const HELP: &'static str = "user API token used for basic auth";

        fn parse(raw: &str) -> EnvResult<String> {
            let token = raw.trim();
            if token.len() >= 8 {
                Ok(token.to_string())
            } else {
                Err(invalid(Self::NAME, "token is too short"))
            }
        }
    }
}

/// 所有变量的名称与说明，用于 `--help` 之外的文档
pub fn describe() -> Vec<(&'static str, &'static str)> {
    vec![
        (core::LogLevel::NAME, core::LogLevel::HELP),
        (bundle::OutputDir::NAME, bundle::OutputDir::HELP),
        (bundle::MaxDepth::NAME, bundle::MaxDepth::HELP),
        (bundle::SkipEmpty::NAME, bundle::SkipEmpty::HELP),
        (api::ApiUrl::NAME, api::ApiUrl::HELP),
        (api::User::NAME, api::User::HELP),
        (api::Token::NAME, api::Token::HELP),
    ]
}
