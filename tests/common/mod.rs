//! 集成测试共用的辅助函数
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use guru_bundle::{Bundle, BundleOptions};
use tempfile::TempDir;

/// 输出目录位于临时目录中的 bundle
pub fn bundle_in(dir: &TempDir, id: &str) -> Bundle {
    Bundle::new(id, options_in(dir)).unwrap()
}

pub fn options_in(dir: &TempDir) -> BundleOptions {
    BundleOptions::default().with_output_dir(dir.path().join("out"))
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

pub fn read_yaml(path: &Path) -> serde_yaml::Value {
    serde_yaml::from_str(&read(path)).unwrap()
}

/// `Items` 列表中的 `ID`
pub fn item_ids(value: &serde_yaml::Value) -> Vec<String> {
    value["Items"]
        .as_sequence()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["ID"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn write_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
