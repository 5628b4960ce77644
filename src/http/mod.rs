//! HTTP plumbing shared by the endpoint wrappers.

mod response;

pub use response::{ClassifiedBody, classify_body};
