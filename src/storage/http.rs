//! Elasticsearch-compatible HTTP store.
//!
//! Talks to a cluster over its REST API using `reqwest`. Non-success answers are
//! turned into [`StoreError::Rejected`] with the response body as diagnostic so
//! callers can log what the backend actually said.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};

use crate::config::{Authentication, ClientConfig, Refresh};
use crate::error::{Result, VariaError};
use crate::storage::traits::{
    BulkItem, BulkResponse, DocumentStore, IndexStats, StoreError, StoreHealth, StoreResult,
    StoredDocument,
};

/// A [`DocumentStore`] backed by an Elasticsearch HTTP endpoint.
pub struct HttpStore {
    client: Client,
    host: String,
    authentication: Option<Authentication>,
    refresh: Refresh,
    debug_mode: bool,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("host", &self.host)
            .field("authenticated", &self.authentication.is_some())
            .field("refresh", &self.refresh)
            .finish()
    }
}

fn transport(error: reqwest::Error) -> StoreError {
    StoreError::Transport(error.to_string())
}

impl HttpStore {
    /// Create a store from client settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| VariaError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpStore {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            authentication: config.authentication.clone(),
            refresh: config.refresh,
            debug_mode: config.enable_debug_mode,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.host, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        match &self.authentication {
            Some(Authentication::ApiKey { key }) => {
                builder.header("Authorization", format!("ApiKey {key}"))
            }
            Some(Authentication::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            None => builder,
        }
    }

    fn trace(&self, operation: &str, index: &str, body: &Value) {
        if self.debug_mode {
            debug!("{operation} [{index}] request: {body}");
        }
    }

    /// Turn a response into JSON, mapping failures to store errors.
    async fn read(response: Response, index: &str) -> StoreResult<Value> {
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| StoreError::invalid_response(format!("{e}: {text}")));
        }
        if status == StatusCode::NOT_FOUND && text.contains("index_not_found_exception") {
            return Err(StoreError::IndexNotFound(index.to_string()));
        }
        Err(StoreError::rejected(status.as_u16(), text))
    }

    fn bulk_body(index: &str, documents: &[StoredDocument]) -> String {
        let mut body = String::new();
        for document in documents {
            let action = json!({ "index": { "_index": index, "_id": document.id } });
            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&document.source.to_string());
            body.push('\n');
        }
        body
    }
}

fn bulk_items(response: &Value) -> StoreResult<Vec<BulkItem>> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::invalid_response("bulk response without items"))?;

    items
        .iter()
        .map(|item| {
            let result = item
                .get("index")
                .ok_or_else(|| StoreError::invalid_response("bulk item without index action"))?;
            let id = result
                .get("_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let error = result.get("error").map(|error| {
                let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
                let reason = error.get("reason").and_then(Value::as_str).unwrap_or_default();
                format!("{kind}: {reason}")
            });
            Ok(BulkItem { id, error })
        })
        .collect()
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        let response = self
            .request(Method::HEAD, index)
            .send()
            .await
            .map_err(transport)?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StoreError::rejected(
                status.as_u16(),
                format!("unexpected status checking index [{index}]"),
            )),
        }
    }

    async fn create_index(&self, index: &str, mappings: &Value) -> StoreResult<()> {
        let body = json!({ "mappings": mappings });
        self.trace("create_index", index, &body);
        let response = self
            .request(Method::PUT, index)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        Self::read(response, index).await.map(|_| ())
    }

    async fn delete_index(&self, index: &str) -> StoreResult<()> {
        let response = self
            .request(Method::DELETE, index)
            .send()
            .await
            .map_err(transport)?;
        Self::read(response, index).await.map(|_| ())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[StoredDocument],
    ) -> StoreResult<BulkResponse> {
        if documents.is_empty() {
            return Ok(BulkResponse::default());
        }
        let body = Self::bulk_body(index, documents);
        if self.debug_mode {
            debug!("bulk_index [{index}] request: {body}");
        }
        let response = self
            .request(Method::POST, "_bulk")
            .query(&[("refresh", self.refresh.as_str())])
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::read(response, index).await?;
        Ok(BulkResponse {
            items: bulk_items(&response)?,
        })
    }

    async fn delete_by_query(&self, index: &str, query: &Value) -> StoreResult<u64> {
        let body = json!({ "query": query });
        self.trace("delete_by_query", index, &body);
        // delete_by_query only understands true/false
        let refresh = if self.refresh == Refresh::False {
            "false"
        } else {
            "true"
        };
        let response = self
            .request(Method::POST, &format!("{index}/_delete_by_query"))
            .query(&[("refresh", refresh)])
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let response = Self::read(response, index).await?;
        response
            .get("deleted")
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::invalid_response("delete_by_query response without deleted"))
    }

    async fn search(&self, index: &str, body: &Value) -> StoreResult<Value> {
        self.trace("search", index, body);
        let response = self
            .request(Method::POST, &format!("{index}/_search"))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        Self::read(response, index).await
    }

    async fn stats(&self, index: &str) -> StoreResult<IndexStats> {
        let response = self
            .request(Method::GET, &format!("{index}/_stats/docs"))
            .send()
            .await
            .map_err(transport)?;
        let stats = Self::read(response, index).await?;
        let document_count = stats
            .pointer("/_all/primaries/docs/count")
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::invalid_response("stats response without document count"))?;

        let response = self
            .request(Method::GET, &format!("_cluster/health/{index}"))
            .send()
            .await
            .map_err(transport)?;
        let health = Self::read(response, index)
            .await?
            .get("status")
            .and_then(Value::as_str)
            .map(StoreHealth::parse)
            .unwrap_or(StoreHealth::Unknown);

        Ok(IndexStats {
            document_count,
            health,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_body_is_ndjson() {
        let documents = vec![StoredDocument {
            id: "k.inv.def".to_string(),
            source: json!({"key": "k"}),
        }];

        let body = HttpStore::bulk_body("products", &documents);
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            serde_json::from_str::<Value>(lines[0]).unwrap(),
            json!({"index": {"_index": "products", "_id": "k.inv.def"}})
        );
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_bulk_items_errors() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 400, "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"}}}
            ]
        });

        let items = bulk_items(&response).unwrap();
        assert_eq!(items[0].error, None);
        assert_eq!(
            items[1].error.as_deref(),
            Some("mapper_parsing_exception: failed to parse")
        );
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = ClientConfig {
            authentication: Some(Authentication::ApiKey {
                key: "secret".to_string(),
            }),
            ..Default::default()
        };
        let store = HttpStore::new(&config).unwrap();

        assert!(!format!("{store:?}").contains("secret"));
    }
}
