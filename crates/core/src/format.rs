//! Chart dataset formatting: labels, colors and graph permalinks

use crate::data::{
    ChartDataset, ChartInput, ChartMeta, ChartPoint, ChartSeries, ChartWarning, MetricSeries,
    SeriesConfig, SeriesMeta, SeriesRequest,
};
use crate::settings::Settings;
use crate::signature::Signature;
use crate::staleness::{days_since_last, is_stale};
use chrono::{DateTime, Utc};

/// Link to the Perfherder graph view showing every given signature
pub fn graph_url<'a, I>(settings: &Settings, signatures: I) -> String
where
    I: IntoIterator<Item = &'a Signature>,
{
    let mut url = format!(
        "{}/perf.html#/graphs?timerange={}",
        settings.base_url(),
        settings.interval_secs
    );

    for signature in signatures {
        url.push_str(&format!(
            "&series={},{},1,{}",
            settings.repo, signature.id, signature.framework
        ));
    }

    url
}

/// Color for the line at `index`, wrapping around the palette
pub fn palette_color(palette: &[String], index: usize) -> Option<String> {
    if palette.is_empty() {
        return None;
    }
    Some(palette[index % palette.len()].clone())
}

/// Drop the `"<suite>-"` prefix of a subtest name ("tp6-amazon" -> "amazon")
pub fn strip_suite_prefix<'a>(suite: &str, test: &'a str) -> &'a str {
    test.strip_prefix(suite)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(test)
}

/// Human label for one line of `request`
pub fn series_label(request: &SeriesRequest, signature: &Signature) -> String {
    if request.options.include_subtests && request.config.test.is_none() {
        return match &signature.test {
            Some(test) => strip_suite_prefix(&signature.suite, test).to_string(),
            None => signature.suite.clone(),
        };
    }

    request
        .label
        .clone()
        .unwrap_or_else(|| signature.suite.clone())
}

/// Config that reproduces a single line, for diagnostics
fn line_config(request: &SeriesRequest, signature: &Signature) -> SeriesConfig {
    SeriesConfig {
        test: signature.test.clone().or_else(|| request.config.test.clone()),
        ..request.config.clone()
    }
}

/// Build the chart dataset from the fetched requests.
///
/// Lines appear in request order, then in signature order within a request.
/// Lines without points are reported as [`ChartWarning::NoData`] instead of
/// being drawn; `missing` lists whole requests that produced no data.
pub fn format(
    inputs: Vec<ChartInput>,
    missing: Vec<SeriesConfig>,
    settings: &Settings,
    now: DateTime<Utc>,
) -> ChartDataset {
    let mut datasets = Vec::new();
    let mut meta_series = Vec::new();
    let mut warnings: Vec<ChartWarning> = missing
        .into_iter()
        .map(|config| ChartWarning::NoData { config })
        .collect();
    let mut drawn_signatures: Vec<Signature> = Vec::new();
    let mut request_urls = Vec::with_capacity(inputs.len());

    for ChartInput { request, suite } in inputs {
        request_urls.push(suite.perfherder_url);
        for series in suite.series {
            if series.is_empty() {
                warnings.push(ChartWarning::NoData {
                    config: line_config(&request, &series.signature),
                });
                continue;
            }

            let label = series_label(&request, &series.signature);
            let color = if request.options.include_subtests {
                palette_color(&settings.palette, datasets.len())
            } else {
                None
            };
            let series = series.with_presentation(label, color);

            let stale = is_stale(&series, settings.freshness_days, now);
            if stale {
                warnings.push(ChartWarning::Stale {
                    label: series.label.clone(),
                    days: days_since_last(&series, now).unwrap_or_default(),
                });
            }

            drawn_signatures.push(series.signature.clone());
            meta_series.push(SeriesMeta {
                label: series.label.clone(),
                url: series.url.clone(),
                signature: series.signature.clone(),
            });
            datasets.push(to_chart_series(series, stale));
        }
    }

    ChartDataset {
        datasets,
        meta: ChartMeta {
            url: graph_url(settings, &drawn_signatures),
            request_urls,
            series: meta_series,
        },
        warnings,
    }
}

fn to_chart_series(series: MetricSeries, stale: bool) -> ChartSeries {
    ChartSeries {
        data: series
            .points
            .iter()
            .map(|p| ChartPoint {
                x: p.datetime,
                y: p.point.value,
            })
            .collect(),
        label: series.label,
        color: series.color,
        stale,
    }
}
