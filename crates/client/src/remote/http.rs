//! HTTP document store client.
//!
//! # Wire format
//!
//! - `GET {base}/v1/{collection}/{id}` returns the document as a JSON object,
//!   or `404` when it does not exist.
//! - `PATCH {base}/v1/{collection}/{id}` merges fields. Body:
//!   `{"fields": {...}, "serverTimestamps": ["updatedAt"]}`. Fields listed in
//!   `serverTimestamps` are set from the server clock.
//!
//! `401` and `403` map to [`RemoteError::PermissionDenied`]; any other
//! non-success status maps to [`RemoteError::Api`].

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use super::{Collection, Document, DocumentStore, FieldValue, RemoteError};
use crate::config::RemoteConfig;

/// API version prefix.
const API_VERSION: &str = "v1";

/// Document store reached over HTTP.
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeRequest {
    fields: Map<String, Value>,
    server_timestamps: Vec<String>,
}

impl HttpDocumentStore {
    /// Create a client for the configured store.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key.expose_secret());
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&auth_value).map_err(|e| {
                    RemoteError::Unavailable(format!("Invalid API key format: {e}"))
                })?,
            );
        }

        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// URL of one document. The id is percent-encoded as a single segment.
    fn document_url(&self, collection: Collection, id: &str) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RemoteError::Unavailable(format!("Base URL cannot hold a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend([API_VERSION, collection.as_str(), id]);
        Ok(url)
    }
}

impl std::fmt::Debug for HttpDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDocumentStore")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, RemoteError> {
        let url = self.document_url(collection, id)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(%collection, id, "Document not found");
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, message));
        }

        let body = response.text().await?;
        let document: Document = serde_json::from_str(&body)?;
        Ok(Some(document))
    }

    async fn merge(
        &self,
        collection: Collection,
        id: &str,
        fields: Vec<(String, FieldValue)>,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(collection, id)?;
        let body = merge_request(fields);

        let response = self.client.patch(url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, message));
        }

        Ok(())
    }
}

fn merge_request(fields: Vec<(String, FieldValue)>) -> MergeRequest {
    let mut request = MergeRequest {
        fields: Map::new(),
        server_timestamps: Vec::new(),
    };
    for (name, value) in fields {
        match value {
            FieldValue::Value(value) => {
                request.fields.insert(name, value);
            }
            FieldValue::ServerTimestamp => request.server_timestamps.push(name),
        }
    }
    request
}

fn status_error(status: StatusCode, message: String) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied(message),
        _ => RemoteError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

    fn store(base: &str) -> HttpDocumentStore {
        HttpDocumentStore::new(&RemoteConfig {
            base_url: Url::parse(base).unwrap(),
            api_key: Some(SecretString::from("k3y-with-enough-length".to_string())),
        })
        .unwrap()
    }

    #[test]
    fn test_document_url_appends_segments() {
        let url = store("https://docs.test/api/")
            .document_url(Collection::Carts, "u1")
            .unwrap();
        assert_eq!(url.as_str(), "https://docs.test/api/v1/carts/u1");

        let url = store("https://docs.test")
            .document_url(Collection::Buyers, "a/b c")
            .unwrap();
        assert_eq!(url.as_str(), "https://docs.test/v1/buyers/a%2Fb%20c");
    }

    #[test]
    fn test_merge_request_body() {
        let body = merge_request(vec![
            ("items".to_string(), FieldValue::Value(json!([]))),
            ("updatedAt".to_string(), FieldValue::ServerTimestamp),
        ]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"fields": {"items": []}, "serverTimestamps": ["updatedAt"]})
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            RemoteError::PermissionDenied(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
            RemoteError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", store("https://docs.test"));
        assert!(!debug.contains("k3y"));
    }
}
