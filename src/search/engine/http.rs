//! OpenSearch REST backend.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::SearchSettings;
use crate::search::engine::{ClusterHealth, SearchEngine, WriteResult};
use crate::search::error::{Result, SearchError};
use crate::search::request::{RawSearchResponse, SearchRequest};
use crate::search::schema::IndexMapping;

pub struct OpenSearchEngine {
    client: reqwest::Client,
    base: Url,
    credentials: Option<(String, Option<String>)>,
}

#[derive(Deserialize)]
struct Acknowledged {
    #[serde(default)]
    acknowledged: bool,
}

#[derive(Deserialize)]
struct IndexResponse {
    result: WriteResult,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(rename = "_all")]
    all: StatsEntry,
}

#[derive(Deserialize)]
struct StatsEntry {
    total: StatsTotal,
}

#[derive(Deserialize)]
struct StatsTotal {
    store: StoreStats,
}

#[derive(Deserialize)]
struct StoreStats {
    size_in_bytes: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Message(String),
}

impl OpenSearchEngine {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        let base = Url::parse(&settings.host)
            .map_err(|e| SearchError::InvalidUrl(format!("{}: {e}", settings.host)))?;
        if base.cannot_be_a_base() {
            return Err(SearchError::InvalidUrl(settings.host.clone()));
        }

        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .danger_accept_invalid_certs(!settings.verify_certs);
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let credentials = settings
            .username
            .clone()
            .map(|user| (user, settings.password.clone()));

        Ok(Self {
            client: builder.build()?,
            base,
            credentials,
        })
    }

    /// Append path segments to the host URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "engine request");
        let request = self.client.request(method, url);
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_ref()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, index: Option<&str>, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(decode_error(index, status, &body));
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Unwrap `{"<index>": {"<section>": {...}}}` responses.
    async fn index_section(&self, index: &str, endpoint: &str, section: &str) -> Result<serde_json::Value> {
        let url = self.url(&[index, endpoint])?;
        let response: serde_json::Value = self.send(Some(index), self.request(Method::GET, url)).await?;
        let entry = response
            .get(index)
            .or_else(|| response.as_object().and_then(|indices| indices.values().next()));
        Ok(entry
            .and_then(|entry| entry.get(section))
            .cloned()
            .unwrap_or_else(|| serde_json::json!({})))
    }
}

/// Map an engine error response onto [`SearchError`].
fn decode_error(index: Option<&str>, status: StatusCode, body: &[u8]) -> SearchError {
    let index_name = index.unwrap_or_default().to_string();
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail::Structured { kind, reason },
        }) => match kind.as_str() {
            "index_not_found_exception" => SearchError::IndexNotFound(index_name),
            "resource_already_exists_exception" => SearchError::IndexAlreadyExists(index_name),
            _ => SearchError::Api {
                status: status.as_u16(),
                reason: reason.unwrap_or_else(|| kind.clone()),
                kind,
            },
        },
        Ok(ErrorBody {
            error: ErrorDetail::Message(reason),
        }) => SearchError::Api {
            status: status.as_u16(),
            kind: "error".to_string(),
            reason,
        },
        Err(_) if status == StatusCode::NOT_FOUND && index.is_some() => {
            SearchError::IndexNotFound(index_name)
        }
        Err(_) => SearchError::Api {
            status: status.as_u16(),
            kind: "http".to_string(),
            reason: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[async_trait]
impl SearchEngine for OpenSearchEngine {
    fn kind(&self) -> &'static str {
        "opensearch"
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.url(&[index])?;
        let response = self.request(Method::HEAD, url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(decode_error(Some(index), status, &[])),
        }
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<bool> {
        let url = self.url(&[index])?;
        let ack: Acknowledged = self
            .send(Some(index), self.request(Method::PUT, url).json(mapping))
            .await?;
        Ok(ack.acknowledged)
    }

    async fn delete_index(&self, index: &str) -> Result<()> {
        let url = self.url(&[index])?;
        let _: Acknowledged = self.send(Some(index), self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &serde_json::Value,
        refresh: bool,
    ) -> Result<WriteResult> {
        let mut url = self.url(&[index, "_doc", id])?;
        url.query_pairs_mut()
            .append_pair("refresh", if refresh { "true" } else { "false" });
        let response: IndexResponse = self
            .send(Some(index), self.request(Method::PUT, url).json(source))
            .await?;
        Ok(response.result)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> Result<RawSearchResponse> {
        let url = self.url(&[index, "_search"])?;
        self.send(Some(index), self.request(Method::POST, url).json(request))
            .await
    }

    async fn count(&self, index: &str) -> Result<u64> {
        let url = self.url(&[index, "_count"])?;
        let response: CountResponse = self.send(Some(index), self.request(Method::GET, url)).await?;
        Ok(response.count)
    }

    async fn store_size(&self, index: &str) -> Result<u64> {
        let url = self.url(&[index, "_stats", "store"])?;
        let response: StatsResponse = self.send(Some(index), self.request(Method::GET, url)).await?;
        Ok(response.all.total.store.size_in_bytes)
    }

    async fn cluster_health(&self, index: Option<&str>) -> Result<ClusterHealth> {
        let url = match index {
            Some(index) => self.url(&["_cluster", "health", index])?,
            None => self.url(&["_cluster", "health"])?,
        };
        self.send(index, self.request(Method::GET, url)).await
    }

    async fn cluster_info(&self) -> Result<serde_json::Value> {
        let url = self.url(&[])?;
        self.send(None, self.request(Method::GET, url)).await
    }

    async fn get_mapping(&self, index: &str) -> Result<serde_json::Value> {
        self.index_section(index, "_mapping", "mappings").await
    }

    async fn get_settings(&self, index: &str) -> Result<serde_json::Value> {
        self.index_section(index, "_settings", "settings").await
    }
}
