//! Record store backed by a document-store HTTP data API

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_created_at, LatestRecordSnapshot, RecordStore, StoreConnection, StoreError};
use crate::config::StoreConfig;

const CREATED_AT_FIELD: &str = "createdAt";

/// Record store reached through `POST {uri}/action/find`
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    config: StoreConfig,
    timeout: Duration,
}

impl HttpRecordStore {
    /// Create a new store handle; no connection is opened until `connect`
    pub fn new(config: StoreConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    fn find_url(&self) -> String {
        format!("{}/action/find", self.config.uri.trim_end_matches('/'))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        // A fresh client per cycle keeps pooled sockets from outliving the cycle
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| StoreError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!(
            database = %self.config.database,
            collection = %self.config.collection,
            "Opened store connection"
        );

        Ok(Box::new(HttpConnection {
            client,
            url: self.find_url(),
            config: self.config.clone(),
        }))
    }
}

struct HttpConnection {
    client: reqwest::Client,
    url: String,
    config: StoreConfig,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    documents: Vec<serde_json::Value>,
}

#[async_trait]
impl StoreConnection for HttpConnection {
    async fn latest_record(&mut self) -> Result<Option<LatestRecordSnapshot>, StoreError> {
        let request = serde_json::json!({
            "dataSource": self.config.data_source,
            "database": self.config.database,
            "collection": self.config.collection,
            "sort": { "_id": -1 },
            "limit": 1,
        });

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!(
                "find returned status {}: {}",
                status, error_text
            )));
        }

        let result: FindResponse = response
            .json()
            .await
            .map_err(|e| {
                StoreError::Query(format!("Invalid find response: {}", e.without_url()))
            })?;

        let Some(document) = result.documents.into_iter().next() else {
            return Ok(None);
        };

        let created_at = document.get(CREATED_AT_FIELD).ok_or_else(|| {
            StoreError::MalformedData(format!("latest record has no {} field", CREATED_AT_FIELD))
        })?;

        Ok(Some(LatestRecordSnapshot {
            created_at: parse_created_at(created_at)?,
        }))
    }

    async fn close(&mut self) {
        tracing::debug!(collection = %self.config.collection, "Closed store connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer, api_key: Option<&str>) -> HttpRecordStore {
        HttpRecordStore::new(
            StoreConfig {
                uri: format!("{}/endpoint/data/v1/", server.uri()),
                database: "telemetry".to_string(),
                collection: "readings".to_string(),
                data_source: "Cluster0".to_string(),
                api_key: api_key.map(String::from),
            },
            Duration::from_secs(5),
        )
    }

    async fn fetch(store: &HttpRecordStore) -> Result<Option<LatestRecordSnapshot>, StoreError> {
        let mut conn = store.connect().await?;
        let result = conn.latest_record().await;
        conn.close().await;
        result
    }

    #[tokio::test]
    async fn test_fetch_latest_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/endpoint/data/v1/action/find"))
            .and(header("api-key", "k1"))
            .and(body_partial_json(json!({
                "database": "telemetry",
                "collection": "readings",
                "sort": { "_id": -1 },
                "limit": 1,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [{ "_id": "abc", "createdAt": { "$date": "2024-03-01T12:30:00Z" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = fetch(&store_for(&server, Some("k1"))).await.unwrap().unwrap();
        assert_eq!(
            snapshot.created_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "documents": [] })))
            .mount(&server)
            .await;

        assert!(fetch(&store_for(&server, None)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_query_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        match fetch(&store_for(&server, None)).await {
            Err(StoreError::Query(msg)) => assert!(msg.contains("invalid api key")),
            other => panic!("expected query error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_created_at_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "documents": [{ "_id": "abc" }] })),
            )
            .mount(&server)
            .await;

        assert!(matches!(
            fetch(&store_for(&server, None)).await,
            Err(StoreError::MalformedData(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_connection_error() {
        // Reserve a port, then free it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = HttpRecordStore::new(
            StoreConfig {
                uri: format!("http://monitor:s3cretpw@{}", addr),
                database: "telemetry".to_string(),
                collection: "readings".to_string(),
                data_source: "Cluster0".to_string(),
                api_key: None,
            },
            Duration::from_secs(5),
        );

        match fetch(&store).await {
            Err(StoreError::Connection(msg)) => assert!(!msg.contains("s3cretpw")),
            other => panic!("expected connection error, got {:?}", other),
        }
    }
}
