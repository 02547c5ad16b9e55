//! 将打包好的压缩包上传到集合
//!
//! 集合可以用 id 或名称指定；名称通过列出全部集合来解析。

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use tracing::info;

use crate::core::{BundleError, BundleResult};
use crate::env::{api, EnvVar};

pub const DEFAULT_API_URL: &str = "https://api.getguru.com/api/v1";

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// 集合的基本信息
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// REST 接口客户端，只包含上传所需的调用
#[derive(Debug, Clone)]
pub struct GuruClient {
    client: Client,
    api_url: String,
    user: String,
    token: String,
}

impl GuruClient {
    pub fn new(api_url: &str, user: &str, token: &str) -> BundleResult<Self> {
        let client = Client::builder().timeout(UPLOAD_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            token: token.to_string(),
        })
    }

    /// 从 `GURU_API_URL`、`GURU_USER`、`GURU_API_TOKEN` 创建
    pub fn from_env() -> BundleResult<Self> {
        Self::new(&api::ApiUrl::get()?, &api::User::get()?, &api::Token::get()?)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn collections(&self) -> BundleResult<Vec<Collection>> {
        let url = format!("{}/collections", self.api_url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.token))
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BundleError::Upload(format!(
                "listing collections returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text()?;
        serde_json::from_str(&body)
            .map_err(|e| BundleError::Upload(format!("unexpected collections response: {}", e)))
    }

    /// 按 id 或名称（不区分大小写）查找集合
    pub fn find_collection(&self, collection: &str) -> BundleResult<Collection> {
        select_collection(self.collections()?, collection)
            .ok_or_else(|| BundleError::Upload(format!("collection not found: {}", collection)))
    }

    /// 上传压缩包，返回接口的 JSON 响应
    pub fn upload_bundle(&self, collection: &str, archive: &Path) -> BundleResult<serde_json::Value> {
        let target = self.find_collection(collection)?;
        let url = format!("{}/app/contentsync/{}", self.api_url, target.id);
        info!("Uploading {} to collection {} ({})", archive.display(), target.name, target.id);

        let form = multipart::Form::new().file("file", archive)?;
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.user, Some(&self.token))
            .multipart(form)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(BundleError::Upload(format!(
                "upload returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
    }
}

fn select_collection(collections: Vec<Collection>, wanted: &str) -> Option<Collection> {
    let wanted = wanted.trim();
    collections.into_iter().find(|collection| {
        collection.id == wanted
            || collection.name.eq_ignore_ascii_case(wanted)
            || collection.slug.as_deref() == Some(wanted)
    })
}
