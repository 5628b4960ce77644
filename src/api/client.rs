use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::multipart::Form;
use serde_json::Value;

use crate::http::classify_body;

use super::types::UploadFile;

/// Operations exposed by the conversion service API.
///
/// Every call is one request/response round trip; response bodies are passed
/// through as raw JSON. Callers sequence the operations themselves, e.g.
/// upload, then start processing, then poll the status endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<Value>;
    async fn start_process(&self, task_id: &str, request_data: &Value) -> Result<Value>;
    async fn get_status(&self, task_id: &str) -> Result<Value>;
    async fn list_tasks(&self) -> Result<Value>;
    async fn delete_task(&self, task_id: &str) -> Result<Value>;
    async fn download_result(&self, task_id: &str) -> Result<Vec<u8>>;
    async fn get_config(&self) -> Result<Value>;
    async fn update_config(&self, config: &Value) -> Result<Value>;
    async fn list_providers(&self) -> Result<Value>;
    fn base_url(&self) -> &str;
}

pub struct TabScan {
    pub client: Client,
    pub base_url: String,
}

impl TabScan {
    #[tracing::instrument(skip(client, base_url))]
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| "http://127.0.0.1:8000/api".to_string());
        Self { client, base_url }
    }

    /// GET returning JSON, with a fixed message on any non-success status.
    /// The error body is not inspected.
    async fn get_json(&self, url: &str, failure: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            bail!("{}", failure);
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse JSON response")
    }

    /// DELETE returning JSON, same fixed-message policy as [`Self::get_json`].
    async fn delete_json(&self, url: &str, failure: &str) -> Result<Value> {
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            bail!("{}", failure);
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse JSON response")
    }
}

#[async_trait]
impl TaskApi for TabScan {
    #[tracing::instrument(skip(self, files))]
    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<Value> {
        let url = format!("{}/upload", self.base_url);

        debug!("Uploading {} file(s) to {}...", files.len(), url);

        // Repeated `files` field, in input order.
        let mut form = Form::new();
        for file in files {
            form = form.part("files", file.into_part()?);
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload request")?;

        let status = response.status();
        if !status.is_success() {
            let body = classify_body(response).await?.into_detail();
            match detail_message(&body) {
                Some(message) => bail!("{}", message),
                None => bail!("上传失败 ({})", status.as_u16()),
            }
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse JSON response")
    }

    /// Starts a processing run. The body is `request_data` verbatim; the
    /// backend expects the task id inside the envelope, so `task_id` here
    /// only identifies the call in logs.
    #[tracing::instrument(skip(self, request_data))]
    async fn start_process(&self, task_id: &str, request_data: &Value) -> Result<Value> {
        let url = format!("{}/process", self.base_url);

        debug!("Starting processing for task {} via {}...", task_id, url);

        let response = self
            .client
            .post(&url)
            .json(request_data)
            .send()
            .await
            .context("Failed to send process request")?;

        let status = response.status();
        if !status.is_success() {
            let body = classify_body(response).await?.into_detail();
            // A detail array is the backend's field-validation format.
            if let Some(Value::Array(items)) = body.get("detail") {
                let details: Vec<String> = items.iter().map(validation_message).collect();
                bail!("请求参数错误: {}", details.join(", "));
            }
            match detail_message(&body) {
                Some(message) => bail!("{}", message),
                None => bail!("启动处理失败 ({})", status.as_u16()),
            }
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse JSON response")
    }

    #[tracing::instrument(skip(self))]
    async fn get_status(&self, task_id: &str) -> Result<Value> {
        let url = format!("{}/status/{}", self.base_url, task_id);

        debug!("Fetching status for task {}...", task_id);

        self.get_json(&url, "获取状态失败").await
    }

    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Value> {
        let url = format!("{}/tasks", self.base_url);

        debug!("Fetching task list from {}...", url);

        self.get_json(&url, "获取任务列表失败").await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, task_id: &str) -> Result<Value> {
        let url = format!("{}/tasks/{}", self.base_url, task_id);

        debug!("Deleting task {}...", task_id);

        self.delete_json(&url, "删除任务失败").await
    }

    /// Downloads the converted spreadsheet for a completed task. The body is
    /// read in full before returning.
    #[tracing::instrument(skip(self))]
    async fn download_result(&self, task_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/download/{}", self.base_url, task_id);

        debug!("Downloading result for task {}...", task_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send download request")?;

        let status = response.status();
        if !status.is_success() {
            let body = classify_body(response).await?.into_detail();
            match detail_message(&body) {
                Some(message) => bail!("{}", message),
                None => bail!("下载失败 ({})", status.as_u16()),
            }
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read download body")?;

        Ok(bytes.to_vec())
    }

    #[tracing::instrument(skip(self))]
    async fn get_config(&self) -> Result<Value> {
        let url = format!("{}/config", self.base_url);

        debug!("Fetching service configuration from {}...", url);

        self.get_json(&url, "获取配置失败").await
    }

    #[tracing::instrument(skip(self, config))]
    async fn update_config(&self, config: &Value) -> Result<Value> {
        let url = format!("{}/config", self.base_url);

        debug!("Saving service configuration to {}...", url);

        let response = self
            .client
            .post(&url)
            .json(config)
            .send()
            .await
            .context("Failed to send config update request")?;

        let status = response.status();
        if !status.is_success() {
            let body = classify_body(response).await?.into_detail();
            match detail_message(&body) {
                Some(message) => bail!("{}", message),
                None => bail!("保存配置失败 ({})", status.as_u16()),
            }
        }

        response
            .json::<Value>()
            .await
            .context("Failed to parse JSON response")
    }

    #[tracing::instrument(skip(self))]
    async fn list_providers(&self) -> Result<Value> {
        let url = format!("{}/config/providers", self.base_url);

        debug!("Fetching provider list from {}...", url);

        self.get_json(&url, "获取服务商列表失败").await
    }

    #[tracing::instrument(skip(self))]
    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Extracts a display message from a `detail`-shaped error body.
///
/// Absent, null and empty-string details count as missing so callers fall
/// back to their status-code message.
fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

/// Message for one entry of a validation-error detail array: its `msg` field,
/// or the entry's string form when that is missing.
fn validation_message(item: &Value) -> String {
    match item.get("msg").and_then(Value::as_str) {
        Some(msg) => msg.to_string(),
        None => match item {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}
