use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 默认的最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// 标题允许的最大字符数
pub const MAX_TITLE_LEN: usize = 200;

/// 未指定排序索引时使用的哨兵值，排在所有显式索引之后
pub const UNORDERED_INDEX: i64 = i64::MAX;

/// Errors that can occur while building or compiling a bundle
#[derive(Error, Debug)]
pub enum BundleError {
    /// Adding the edge would make a node its own ancestor
    #[error("adding '{child}' under '{parent}' would create a cycle")]
    Cycle { parent: String, child: String },

    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Upsert was called with neither an id nor a url
    #[error("a node needs an id or a url")]
    MissingIdentity,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Env(#[from] crate::env::EnvError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload failed: {0}")]
    Upload(String),
}

pub type BundleResult<T> = Result<T, BundleError>;

/// Configuration options for compiling a bundle
///
/// Values are layered: defaults, then an optional TOML file, then
/// environment overrides, then whatever the caller sets explicitly.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BundleOptions {
    /// 输出根目录，每次编译写入 `<output_dir>/<bundle-id>/`
    pub output_dir: PathBuf,
    /// 文件夹允许的最大嵌套深度
    pub max_depth: usize,
    /// 移除没有子节点的文件夹以及没有内容的卡片
    pub skip_empty_containers: bool,
    /// 写入前清空本次的输出目录
    pub clear_output: bool,
    /// 清单中的集合标题，默认使用 bundle id
    pub collection_title: Option<String>,
    /// 额外生成可在浏览器中查看的 index.html
    pub write_preview: bool,
    /// 导出 CSV 格式的诊断日志
    pub write_csv_log: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir().join("guru_bundles"),
            max_depth: DEFAULT_MAX_DEPTH,
            skip_empty_containers: false,
            clear_output: true,
            collection_title: None,
            write_preview: false,
            write_csv_log: true,
        }
    }
}

impl BundleOptions {
    /// 从 TOML 配置文件加载，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> BundleResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> BundleResult<Self> {
        let options: BundleOptions = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// 应用已设置的环境变量，取值无效时报错
    pub fn apply_env_overrides(&mut self) -> BundleResult<()> {
        use crate::env::{bundle, EnvVar};

        if let Some(dir) = bundle::OutputDir::read()? {
            self.output_dir = dir;
        }
        if let Some(max_depth) = bundle::MaxDepth::read()? {
            self.max_depth = max_depth;
        }
        if let Some(skip_empty) = bundle::SkipEmpty::read()? {
            self.skip_empty_containers = skip_empty;
        }

        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> BundleResult<()> {
        if self.max_depth == 0 {
            return Err(BundleError::Config(
                "max_depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_skip_empty_containers(mut self, skip: bool) -> Self {
        self.skip_empty_containers = skip;
        self
    }
}

/// 截断过长的标题，并以省略号结尾
pub fn truncate_title(title: &str) -> String {
    let title = title.trim();
    if title.chars().count() <= MAX_TITLE_LEN {
        return title.to_string();
    }

    let mut truncated: String = title.chars().take(MAX_TITLE_LEN - 3).collect();
    truncated.push_str("...");
    truncated
}
