//! Content-type-driven classification of HTTP response bodies.

use anyhow::{Context, Result};
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

/// A response body read in full, tagged by how it was decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedBody {
    Json(Value),
    Text(String),
}

impl ClassifiedBody {
    /// Normalizes the body into a `detail`-shaped JSON object.
    ///
    /// JSON bodies pass through unchanged; plain-text bodies are wrapped as
    /// `{ "detail": <text> }` so error-path callers can always look up a
    /// `detail` field regardless of what the server actually sent.
    pub fn into_detail(self) -> Value {
        match self {
            ClassifiedBody::Json(value) => value,
            ClassifiedBody::Text(text) => json!({ "detail": text }),
        }
    }
}

/// Reads a response body, parsing it as JSON when the `content-type` header
/// says so and falling back to plain text otherwise.
///
/// A body that claims to be JSON but fails to parse is an error here, not a
/// text fallback.
pub async fn classify_body(response: Response) -> Result<ClassifiedBody> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    if is_json {
        let value = response
            .json::<Value>()
            .await
            .context("Failed to parse JSON response body")?;
        Ok(ClassifiedBody::Json(value))
    } else {
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok(ClassifiedBody::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    async fn fetch(server: &mockito::Server) -> Response {
        Client::new()
            .get(format!("{}/body", server.url()))
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_classify_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/body")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "bad request"}"#)
            .create_async()
            .await;

        let body = classify_body(fetch(&server).await).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            body,
            ClassifiedBody::Json(json!({ "detail": "bad request" }))
        );
        assert_eq!(
            body.into_detail(),
            json!({ "detail": "bad request" })
        );
    }

    #[tokio::test]
    async fn test_classify_json_with_charset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/body")
            .with_status(500)
            .with_header("content-type", "application/json; charset=utf-8")
            .with_body(r#"{"detail": "内部错误"}"#)
            .create_async()
            .await;

        let body = classify_body(fetch(&server).await).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, ClassifiedBody::Json(json!({ "detail": "内部错误" })));
    }

    #[tokio::test]
    async fn test_classify_text_body_wraps_as_detail() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/body")
            .with_status(502)
            .with_header("content-type", "text/plain")
            .with_body("oops")
            .create_async()
            .await;

        let body = classify_body(fetch(&server).await).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, ClassifiedBody::Text("oops".to_string()));
        assert_eq!(body.into_detail(), json!({ "detail": "oops" }));
    }

    #[tokio::test]
    async fn test_classify_missing_content_type_is_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/body")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let body = classify_body(fetch(&server).await).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, ClassifiedBody::Text("not found".to_string()));
    }

    #[tokio::test]
    async fn test_classify_malformed_json_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/body")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body("{not json")
            .create_async()
            .await;

        let result = classify_body(fetch(&server).await).await;

        mock.assert_async().await;
        assert!(result.is_err());
    }
}
