//! Client for the TabScan conversion service API.

mod client;
mod types;

pub use client::{TabScan, TaskApi};
pub use types::{ColumnConfig, ProcessRequest, TaskStatus, TaskSummary, UploadFile};
