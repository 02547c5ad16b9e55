//! # Bundle 内容树编译器
//!
//! 调用方逐步构建节点图（新建节点、连接父子关系、拆分内容），
//! 最后调用 [`Bundle::zip`] 完成编译。编译按以下顺序执行：
//!
//! 1. 按显式索引对子节点稳定排序
//! 2. 类型确定：有子节点的成为文件夹，超出最大深度的子树被丢弃
//! 3. 为自带内容的文件夹生成内容卡片
//! 4. （可选）删除空文件夹与空卡片
//! 5. 清除已移除的节点
//! 6. 解析每张卡片中的资源引用
//! 7. 写出元数据、内容文件和清单，打包为 zip
//!
//! 节点注册表、资源注册表和诊断日志都属于同一个 `Bundle` 实例，
//! 多次编译之间互不影响。

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use tracing::info;

use crate::core::{BundleError, BundleOptions, BundleResult};
use crate::utils::url::clean_identifier;

pub mod graph;
pub mod log;
pub mod materialize;
pub mod node;
pub mod resources;
pub mod split;
pub mod writer;

pub use graph::Position;
pub use log::{EventLevel, LogEvent, RunLog};
pub use node::{Node, NodeInput, NodeKind};
pub use resources::{DownloadOutcome, ResourceDownloader};

/// 链接匹配回调：`(候选节点, 绝对地址) -> 是否指向该节点`
pub type LinkMatcher<'a> = &'a dyn Fn(&Node, &str) -> bool;

/// 编译时可选的外部协作者
#[derive(Default)]
pub struct CompileHooks<'a> {
    /// 下载资源；不提供时只复制本地文件
    pub downloader: Option<&'a mut dyn ResourceDownloader>,
    /// 额外的交叉引用匹配规则
    pub link_matcher: Option<LinkMatcher<'a>>,
}

impl<'a> CompileHooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_downloader(mut self, downloader: &'a mut dyn ResourceDownloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn with_link_matcher(mut self, matcher: LinkMatcher<'a>) -> Self {
        self.link_matcher = Some(matcher);
        self
    }
}

/// 一次编译的结果
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub archive_path: PathBuf,
    pub log_path: Option<PathBuf>,
    pub containers: usize,
    pub documents: usize,
    pub resources: usize,
    pub events: usize,
    pub elapsed: Duration,
}

/// 内容树及其编译状态
#[derive(Debug)]
pub struct Bundle {
    id: String,
    options: BundleOptions,
    pub(crate) nodes: IndexMap<String, Node>,
    /// 资源 id -> 输出目录内的相对路径
    pub(crate) resources: IndexMap<String, String>,
    pub(crate) log: RunLog,
}

impl Bundle {
    pub fn new(id: &str, options: BundleOptions) -> BundleResult<Self> {
        let id = clean_identifier(id);
        if id.is_empty() {
            return Err(BundleError::InvalidInput(
                "bundle id must contain at least one identifier character".to_string(),
            ));
        }
        options.validate()?;

        Ok(Self {
            id,
            options,
            nodes: IndexMap::new(),
            resources: IndexMap::new(),
            log: RunLog::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &BundleOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut BundleOptions {
        &mut self.options
    }

    /// 本次编译的输出目录
    pub fn run_dir(&self) -> PathBuf {
        self.options.output_dir.join(&self.id)
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// 已登记的资源：资源 id -> 相对路径
    pub fn resources(&self) -> &IndexMap<String, String> {
        &self.resources
    }

    /// 未移除的根节点，按显式索引稳定排序
    pub fn roots(&self) -> Vec<&Node> {
        let mut roots: Vec<&Node> = self
            .nodes
            .values()
            .filter(|node| !node.removed && node.is_root())
            .collect();
        roots.sort_by_key(|node| node.index);
        roots
    }

    /// 缩进的文本大纲，便于调试
    pub fn tree(&self) -> String {
        let mut out = String::new();
        for root in self.roots() {
            self.write_tree(&mut out, root, 0);
        }
        out
    }

    fn write_tree(&self, out: &mut String, node: &Node, depth: usize) {
        let marker = match node.kind {
            Some(NodeKind::Container) => "[F]",
            Some(NodeKind::Document) => "[C]",
            None if node.children.is_empty() => "[-]",
            None => "[+]",
        };
        let _ = writeln!(
            out,
            "{}{} {} ({})",
            "  ".repeat(depth),
            marker,
            node.display_title(),
            node.id
        );

        for child in &node.children {
            if let Some(child_node) = self.nodes.get(child).filter(|n| !n.removed) {
                self.write_tree(out, child_node, depth + 1);
            }
        }
    }

    /// 使用默认协作者编译并打包
    pub fn zip(&mut self) -> BundleResult<CompileReport> {
        self.zip_with(CompileHooks::default())
    }

    /// 编译并打包
    ///
    /// 只有产生环的结构错误或输出目录的 I/O 错误会中断编译，
    /// 其余问题都记录在诊断日志中。
    pub fn zip_with(&mut self, mut hooks: CompileHooks<'_>) -> BundleResult<CompileReport> {
        self.log = RunLog::new();
        self.resources.clear();

        let run_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let run_dir = self.run_dir();
        info!("Compiling bundle {} into {}", self.id, run_dir.display());

        self.sort_children();
        self.assign_kinds();
        self.insert_nodes()?;
        if self.options.skip_empty_containers {
            self.prune_empty();
        }
        self.sweep_removed();

        writer::prepare_run_dir(&run_dir, self.options.clear_output)?;
        self.resolve_resources(&run_dir, &mut hooks);

        let archive_path = writer::write_bundle(self, &run_dir, &run_id)?;

        let containers = self.nodes.values().filter(|n| n.is_container()).count();
        let documents = self.nodes.values().filter(|n| n.is_document()).count();
        self.log.info(
            "Bundle compiled",
            &[
                ("containers", containers.to_string()),
                ("documents", documents.to_string()),
                ("resources", self.resources.len().to_string()),
                ("archive", archive_path.display().to_string()),
            ],
        );

        let log_path = if self.options.write_csv_log {
            let path = run_dir.join(format!("log_{}.csv", run_id));
            self.log.write_csv(&path)?;
            Some(path)
        } else {
            None
        };

        Ok(CompileReport {
            run_id,
            run_dir,
            archive_path,
            log_path,
            containers,
            documents,
            resources: self.resources.len(),
            events: self.log.len(),
            elapsed: self.log.elapsed(),
        })
    }
}
