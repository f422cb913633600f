//! Treeherder / Perfherder API client

use crate::error::Result;
use perfherder_charts_core::{
    DataPoint, Error as CoreError, OptionCollection, Settings, SignatureMap,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Data points keyed by signature hash
pub type SeriesData = HashMap<String, Vec<DataPoint>>;

/// Async Treeherder client bound to one repository
pub struct TreeherderClient {
    client: reqwest::Client,
    base_url: Url,
    repo: String,
}

impl TreeherderClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("perfherder-charts"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        // Url::join drops the last path segment unless the base ends with '/'
        let base_url = Url::parse(&format!("{}/", settings.base_url()))?;

        Ok(Self {
            client,
            base_url,
            repo: settings.repo.clone(),
        })
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("api/{}", path))?)
    }

    fn performance_url(&self, endpoint: &str) -> Result<Url> {
        self.api_url(&format!("project/{}/performance/{}/", self.repo, endpoint))
    }

    /// Option collection hash mapping (`opt`, `pgo`, ... per hash)
    pub async fn option_collections(&self) -> Result<Vec<OptionCollection>> {
        let url = self.api_url("optioncollectionhash/")?;
        self.get_json(url).await
    }

    /// Top-level (non-subtest) signatures of a framework on a platform
    pub async fn top_level_signatures(
        &self,
        framework: u32,
        platform: &str,
    ) -> Result<SignatureMap> {
        let mut url = self.performance_url("signatures")?;
        url.query_pairs_mut()
            .append_pair("framework", &framework.to_string())
            .append_pair("platform", platform)
            .append_pair("subtests", "0");
        self.get_json(url).await
    }

    /// Subtest signatures whose parent is `parent_hash`
    pub async fn subtest_signatures(&self, parent_hash: &str) -> Result<SignatureMap> {
        let mut url = self.performance_url("signatures")?;
        url.query_pairs_mut()
            .append_pair("parent_signature", parent_hash);
        self.get_json(url).await
    }

    /// Data points of every given signature id, in one batched request
    pub async fn performance_data(
        &self,
        signature_ids: &[u64],
        framework: u32,
        interval_secs: u64,
    ) -> Result<SeriesData> {
        let mut url = self.performance_url("data")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("framework", &framework.to_string())
                .append_pair("interval", &interval_secs.to_string());
            for id in signature_ids {
                query.append_pair("signature_id", &id.to_string());
            }
        }
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let query = url.to_string();
        debug!("GET {}", query);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| data_source_error(&query, e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| data_source_error(&query, e.to_string()))?;

        serde_json::from_str(&body)
            .map_err(|e| data_source_error(&query, format!("Malformed JSON: {}", e)))
    }
}

fn data_source_error(query: &str, reason: String) -> crate::error::Error {
    CoreError::DataSourceError {
        query: query.to_string(),
        reason,
    }
    .into()
}
