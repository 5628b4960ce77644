use anyhow::{Context, Result};
use reqwest::multipart::Part;
use serde::{Deserialize, Serialize};

/// An in-memory file queued for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Converts the file into a multipart form part.
    pub fn into_part(self) -> Result<Part> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .context("Invalid content type for upload part")
    }
}

/// Column layout applied when extracting tables from the scanned pages.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    pub headers: Vec<String>,
    pub column_count: usize,
}

/// Full request envelope for starting a processing run.
///
/// The client passes the `/process` body through verbatim; this type is a
/// convenience for building that body with `serde_json::to_value`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ProcessRequest {
    pub task_id: String,
    pub column_config: ColumnConfig,
}

/// State of a conversion task as reported by the status endpoint.
///
/// Status values are `pending`, `processing`, `completed` and `failed`,
/// with `progress` running 0-100.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub task_id: String,
    pub status: String,
    pub progress: u32,
    pub current_file: Option<String>,
    #[serde(default)]
    pub total_files: u32,
    #[serde(default)]
    pub processed_files: u32,
    #[serde(default)]
    pub success_count: u32,
    #[serde(default)]
    pub fail_count: u32,
    pub message: Option<String>,
    pub output_file: Option<String>,
}

/// One entry of the task listing.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TaskSummary {
    pub task_id: String,
    pub status: String,
    pub progress: u32,
    pub total_files: u32,
    pub success_count: u32,
    pub fail_count: u32,
}
