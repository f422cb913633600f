//! Request pipeline: signature resolution, subtest correlation, fetching and formatting
//!
//! Every chart request runs through the same stages:
//!
//! ```text
//! SeriesRequest -> parent signature -> subtests -> data points -> SuiteData -> ChartDataset
//! ```
//!
//! Independent network calls are issued concurrently and joined before the
//! next stage starts. Nothing is shared between requests except the settings.

use crate::error::{Error, Result};
use crate::treeherder::{SeriesData, TreeherderClient};
use chrono::Utc;
use futures::future::join_all;
use perfherder_charts_core::{
    correlate, format, select_parent, ChartDataset, ChartInput, ChartPanel, ChartSpec,
    Error as CoreError, SeriesConfig, SeriesRequest, Settings, Signature, SignatureSet, SuiteData,
};
use tracing::{debug, error, info, warn};

/// Turns series requests into chart datasets
pub struct Pipeline {
    client: TreeherderClient,
    settings: Settings,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.check()?;
        let client = TreeherderClient::new(&settings)?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve the single top-level signature described by `config`
    pub async fn resolve_parent(&self, config: &SeriesConfig) -> Result<Signature> {
        let (options, signatures) = tokio::try_join!(
            self.client.option_collections(),
            self.client
                .top_level_signatures(config.framework, &config.platform),
        )?;

        debug!(
            "Matching {} top-level signatures against {} option collections",
            signatures.len(),
            options.len()
        );

        let parent = select_parent(config, &options, signatures)?;
        debug!("Resolved {} to signature {} ({})", config, parent.id, parent.hash);
        Ok(parent)
    }

    /// Subtests of `parent`, optionally with the parent itself
    pub async fn resolve_subtests(
        &self,
        parent: &Signature,
        include_parent: bool,
    ) -> Result<SignatureSet> {
        let children = self.client.subtest_signatures(&parent.hash).await?;
        debug!("Found {} subtests of {}", children.len(), parent.hash);
        Ok(correlate(parent, children, include_parent))
    }

    /// Data points of every signature in one batched call, keyed by hash
    pub async fn fetch_series(
        &self,
        signatures: &SignatureSet,
        framework: u32,
        interval_secs: u64,
    ) -> Result<SeriesData> {
        if signatures.is_empty() {
            return Ok(SeriesData::new());
        }
        self.client
            .performance_data(&signatures.ids(), framework, interval_secs)
            .await
    }

    /// Everything needed to chart one request
    pub async fn benchmark_data(&self, request: &SeriesRequest) -> Result<SuiteData> {
        let config = &request.config;
        let parent = self.resolve_parent(config).await?;

        let mut signatures = self
            .resolve_subtests(&parent, request.options.include_parent_data)
            .await?;
        if let Some(test) = &config.test {
            signatures.retain_test(test);
        }

        let data = self
            .fetch_series(&signatures, config.framework, self.settings.interval_secs)
            .await?;

        if data.values().all(Vec::is_empty) {
            return Err(CoreError::NoDataError {
                config: config.clone(),
            }
            .into());
        }

        Ok(SuiteData::assemble(
            &signatures,
            data,
            request.options.percentile_threshold,
            &self.settings,
        ))
    }

    /// Fetch every request concurrently and format them into one chart.
    ///
    /// Any ambiguous signature or data source failure aborts the chart. A
    /// request without data aborts it only when it is the first (primary)
    /// request; otherwise it is reported as a warning.
    pub async fn chart(&self, requests: &[SeriesRequest]) -> Result<ChartDataset> {
        if requests.is_empty() {
            return Err(Error::Validation(
                "A chart needs at least one series".to_string(),
            ));
        }

        let outcomes = join_all(requests.iter().map(|r| self.benchmark_data(r))).await;

        let mut inputs = Vec::with_capacity(requests.len());
        let mut missing = Vec::new();
        for (index, (request, outcome)) in requests.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(suite) => inputs.push(ChartInput {
                    request: request.clone(),
                    suite,
                }),
                Err(e) if index > 0 && e.is_no_data() => {
                    warn!("{}", e);
                    missing.push(request.config.clone());
                }
                Err(e) => return Err(e),
            }
        }

        let chart = format(inputs, missing, &self.settings, Utc::now());
        info!(
            "Built chart with {} series ({} warnings)",
            chart.datasets.len(),
            chart.warnings.len()
        );
        Ok(chart)
    }

    /// Build every chart of a dashboard concurrently; failures become error panels
    pub async fn dashboard(&self, charts: &[ChartSpec]) -> Vec<ChartPanel> {
        let outcomes = join_all(charts.iter().map(|spec| self.chart(&spec.series))).await;

        charts
            .iter()
            .zip(outcomes)
            .map(|(spec, outcome)| match outcome {
                Ok(chart) => ChartPanel::ready(spec.title.clone(), chart),
                Err(e) => {
                    error!("Chart '{}' failed: {}", spec.title, e);
                    ChartPanel::failed(spec.title.clone(), &e)
                }
            })
            .collect()
    }
}
