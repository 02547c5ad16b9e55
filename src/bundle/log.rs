//! 编译过程的诊断日志
//!
//! 每次编译产生的事件都按顺序记录在这里，同时输出到 `tracing`。
//! 事件不会中断编译，编译结束后可导出为 CSV 供事后审计。

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use indexmap::{IndexMap, IndexSet};
use tracing::{info, warn};

use crate::core::BundleResult;

/// 事件级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
}

/// 一条诊断事件
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: String,
    pub level: EventLevel,
    pub message: String,
    pub fields: IndexMap<String, String>,
}

impl LogEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// 一次编译的事件记录
#[derive(Debug)]
pub struct RunLog {
    started: Instant,
    events: Vec<LogEvent>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events: Vec::new(),
        }
    }

    pub fn info(&mut self, message: &str, fields: &[(&str, String)]) {
        info!(fields = ?fields, "{}", message);
        self.push(EventLevel::Info, message, fields);
    }

    pub fn warn(&mut self, message: &str, fields: &[(&str, String)]) {
        warn!(fields = ?fields, "{}", message);
        self.push(EventLevel::Warning, message, fields);
    }

    fn push(&mut self, level: EventLevel, message: &str, fields: &[(&str, String)]) {
        self.events.push(LogEvent {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        });
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    /// 指定消息的事件
    pub fn events_with_message<'a>(&'a self, message: &'a str) -> impl Iterator<Item = &'a LogEvent> {
        self.events.iter().filter(move |event| event.message == message)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// 导出为 CSV
    ///
    /// 列为 `timestamp`、`level`、`message`，随后是所有事件字段名的并集（按首次出现顺序）。
    pub fn write_csv(&self, path: &Path) -> BundleResult<()> {
        let mut columns: IndexSet<&str> = IndexSet::new();
        for event in &self.events {
            for name in event.fields.keys() {
                columns.insert(name.as_str());
            }
        }

        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec!["timestamp", "level", "message"];
        header.extend(columns.iter().copied());
        writer.write_record(&header)?;

        for event in &self.events {
            let level = match event.level {
                EventLevel::Info => "info",
                EventLevel::Warning => "warning",
            };
            let mut row = vec![event.timestamp.as_str(), level, event.message.as_str()];
            row.extend(
                columns
                    .iter()
                    .map(|column| event.field(column).unwrap_or_default()),
            );
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_columns_are_union_of_fields() {
        let mut log = RunLog::new();
        log.info("first", &[("node", "a".to_string())]);
        log.warn(
            "second",
            &[("url", "https://x".to_string()), ("node", "b".to_string())],
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        log.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,level,message,node,url");
        assert!(lines[1].ends_with(",info,first,a,"));
        assert!(lines[2].ends_with(",warning,second,b,https://x"));
    }

    #[test]
    fn test_events_with_message() {
        let mut log = RunLog::new();
        log.info("a", &[]);
        log.info("b", &[]);
        log.info("a", &[]);
        assert_eq!(log.events_with_message("a").count(), 2);
        assert_eq!(log.len(), 3);
    }
}
