//! Minimal Appwrite Databases REST client for the search-counter collection.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::AppwriteConfig;
use crate::tmdb::http_client;

/// A stored counter document. `id` is assigned by the store and is unrelated to
/// `search_term`, which is the domain key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: i64,
    pub movie_id: Option<i64>,
    pub poster_url: Option<String>,
    #[serde(rename = "$updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields written when a counter is first created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCounter {
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: i64,
    pub movie_id: i64,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal { attribute: String, value: String },
    OrderDesc(String),
    Limit(usize),
}

impl Query {
    pub fn equal(attribute: &str, value: &str) -> Self {
        Query::Equal {
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    /// Appwrite's JSON query syntax, sent as one `queries[]` parameter each.
    pub fn to_param(&self) -> String {
        let value = match self {
            Query::Equal { attribute, value } => {
                json!({ "method": "equal", "attribute": attribute, "values": [value] })
            }
            Query::OrderDesc(attribute) => json!({ "method": "orderDesc", "attribute": attribute }),
            Query::Limit(n) => json!({ "method": "limit", "values": [n] }),
        };
        value.to_string()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_documents(&self, queries: &[Query]) -> Result<Vec<CounterDocument>>;
    async fn create_document(&self, data: &NewCounter) -> Result<CounterDocument>;
    async fn update_count(&self, document_id: &str, count: i64) -> Result<CounterDocument>;
}

#[derive(Debug, Clone)]
pub struct AppwriteClient {
    client: Client,
    config: AppwriteConfig,
}

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<CounterDocument>,
}

impl AppwriteClient {
    pub fn new(config: AppwriteConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            config,
        })
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.config.endpoint, self.config.database_id, self.config.collection_id
        )
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let mut req = self
            .client
            .request(method, url)
            .header("X-Appwrite-Project", &self.config.project_id)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.config.api_key {
            req = req.header("X-Appwrite-Key", key);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.context("Appwrite request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading Appwrite body failed")?;
        if !status.is_success() {
            return Err(anyhow!("Appwrite error (status {}): {}", status, text));
        }
        serde_json::from_str(&text).context("Failed to parse Appwrite JSON")
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn list_documents(&self, queries: &[Query]) -> Result<Vec<CounterDocument>> {
        let params: Vec<String> = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(&q.to_param())))
            .collect();
        let url = if params.is_empty() {
            self.documents_url()
        } else {
            format!("{}?{}", self.documents_url(), params.join("&"))
        };
        let list: DocumentList = self.send(Method::GET, &url, None).await?;
        Ok(list.documents)
    }

    async fn create_document(&self, data: &NewCounter) -> Result<CounterDocument> {
        let body = json!({ "documentId": "unique()", "data": data });
        self.send(Method::POST, &self.documents_url(), Some(body))
            .await
    }

    async fn update_count(&self, document_id: &str, count: i64) -> Result<CounterDocument> {
        let url = format!("{}/{}", self.documents_url(), urlencoding::encode(document_id));
        self.send(Method::PATCH, &url, Some(json!({ "data": { "count": count } })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_use_json_syntax() {
        let eq: Value = serde_json::from_str(&Query::equal("searchTerm", "dune").to_param()).unwrap();
        assert_eq!(eq["method"], "equal");
        assert_eq!(eq["attribute"], "searchTerm");
        assert_eq!(eq["values"][0], "dune");

        let limit: Value = serde_json::from_str(&Query::Limit(5).to_param()).unwrap();
        assert_eq!(limit, json!({ "method": "limit", "values": [5] }));

        let order: Value =
            serde_json::from_str(&Query::OrderDesc("count".to_string()).to_param()).unwrap();
        assert_eq!(order, json!({ "method": "orderDesc", "attribute": "count" }));
    }

    #[test]
    fn parses_store_document() {
        let raw = r#"{
            "$id": "abc123",
            "$updatedAt": "2025-03-01T10:00:00.000+00:00",
            "searchTerm": "dune",
            "count": 3,
            "movie_id": 438631,
            "poster_url": "https://image.tmdb.org/t/p/w500/x.jpg"
        }"#;
        let doc: CounterDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.search_term, "dune");
        assert_eq!(doc.count, 3);
        assert!(doc.updated_at.is_some());
    }
}
