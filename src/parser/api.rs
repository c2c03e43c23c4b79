use super::{note_dropped, Diagnostic, SeriesSource};
use crate::app::ports::HttpClientPort;
use crate::constants;
use crate::error::{IpcError, Result};
use crate::series::{CanonicalSeries, MonthKey, SeriesBuilder};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Date range sent to the time series API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiWindow {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl ApiWindow {
    fn earliest() -> MonthKey {
        MonthKey::new(constants::API_EARLIEST_YEAR, constants::API_EARLIEST_MONTH)
            .unwrap_or_else(|| MonthKey::from_date(&NaiveDate::MIN))
    }

    /// Window covering a salary period: a year of lead-in before the start
    /// (never before the index base) through the month after the end.
    pub fn for_period(start: MonthKey, end: MonthKey) -> Self {
        let lead_in = start.add_months(-12).max(Self::earliest());
        Self {
            start: lead_in.first_day(),
            end: Some(end.succ().first_day()),
        }
    }

    /// Most recent data likely to be published as of `today`.
    pub fn latest_published(today: NaiveDate) -> Self {
        let end = MonthKey::from_date(&today).add_months(-constants::PUBLICATION_LAG_MONTHS);
        let start = end.add_months(-constants::LATEST_WINDOW_MONTHS);
        Self {
            start: start.first_day(),
            end: Some(end.first_day()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRow {
    pub month: MonthKey,
    /// One entry per requested series, `None` where the value failed coercion.
    pub values: Vec<Option<f64>>,
}

/// The `data` rows of an API response with named value columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiTable {
    pub columns: Vec<String>,
    pub rows: Vec<ApiRow>,
}

impl ApiTable {
    /// Parses `{ "data": [[date, v1, v2, ...], ...] }` with one value column per series id.
    pub fn from_body(
        bytes: &[u8],
        series_ids: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Self> {
        let body: Value = serde_json::from_slice(bytes)?;
        let data = match body.get("data").and_then(|d| d.as_array()) {
            Some(data) if !data.is_empty() => data,
            Some(_) => {
                return Err(IpcError::EmptyResult(format!(
                    "API returned an empty 'data' array{}",
                    api_errors(&body)
                )))
            }
            None => {
                return Err(IpcError::MalformedInput(format!(
                    "missing 'data' array in API response{}",
                    api_errors(&body)
                )))
            }
        };

        let mut rows = Vec::with_capacity(data.len());
        let mut bad_dates = 0usize;
        let mut bad_shape = 0usize;
        for raw in data {
            let Some(cells) = raw.as_array() else {
                bad_shape += 1;
                continue;
            };
            let Some(month) = cells
                .first()
                .and_then(|d| d.as_str())
                .and_then(MonthKey::parse_date)
            else {
                bad_dates += 1;
                continue;
            };
            let values = (0..series_ids.len())
                .map(|i| cells.get(i + 1).and_then(coerce_json))
                .collect();
            rows.push(ApiRow { month, values });
        }
        note_dropped(diagnostics, bad_shape, "a non-array row");
        note_dropped(diagnostics, bad_dates, "an unparseable date");

        if rows.is_empty() {
            return Err(IpcError::MalformedInput(
                "no parseable rows in API 'data' array".to_string(),
            ));
        }
        debug!("API table parsed rows={}", rows.len());
        Ok(Self {
            columns: series_ids.to_vec(),
            rows,
        })
    }

    /// Series for one value column, dropping rows where it is absent.
    pub fn column_series(
        &self,
        source: &str,
        column: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> CanonicalSeries {
        let mut builder = SeriesBuilder::new(source);
        let mut missing = 0usize;
        for row in &self.rows {
            match row.values.get(column).copied().flatten() {
                Some(value) => {
                    builder.push(row.month, value);
                }
                None => missing += 1,
            }
        }
        let column_name = self.columns.get(column).map(String::as_str).unwrap_or("?");
        note_dropped(
            diagnostics,
            missing,
            &format!("no numeric value for series {}", column_name),
        );
        note_dropped(diagnostics, builder.duplicates(), "a repeated month");
        builder.build()
    }
}

fn coerce_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => super::coerce_number(s),
        _ => None,
    }
}

fn api_errors(body: &Value) -> String {
    match body.get("errors") {
        Some(errors) if !errors.is_null() => format!(" (API errors: {})", errors),
        _ => String::new(),
    }
}

/// CPI series fetched from the time series REST API.
pub struct ApiSeriesParser {
    http: Arc<dyn HttpClientPort>,
    base_url: String,
    series_ids: Vec<String>,
    window: ApiWindow,
}

impl ApiSeriesParser {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        base_url: impl Into<String>,
        series_ids: Vec<String>,
        window: ApiWindow,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            series_ids,
            window,
        }
    }

    pub fn request_url(&self) -> Result<String> {
        let mut params = vec![
            ("ids", self.series_ids.join(",")),
            ("start_date", self.window.start.format("%Y-%m-%d").to_string()),
        ];
        if let Some(end) = self.window.end {
            params.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        params.push(("format", "json".to_string()));
        let url = reqwest::Url::parse_with_params(&self.base_url, &params).map_err(|e| {
            IpcError::Config(format!("invalid API base URL '{}': {}", self.base_url, e))
        })?;
        Ok(url.to_string())
    }
}

impl SeriesSource for ApiSeriesParser {
    fn source_name(&self) -> String {
        format!("API {}", self.series_ids.join(","))
    }

    fn try_load(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<CanonicalSeries> {
        if self.series_ids.is_empty() {
            return Err(IpcError::Config("no API series ids requested".to_string()));
        }
        let url = self.request_url()?;
        info!("Fetching CPI series from {}", url);

        let response = self.http.get(&url).map_err(IpcError::SourceUnavailable)?;
        if !(200..300).contains(&response.status) {
            return Err(IpcError::SourceUnavailable(format!(
                "HTTP {} from {}",
                response.status, url
            )));
        }
        debug!(
            "API response status={} size={} bytes content_type={}",
            response.status,
            response.bytes.len(),
            response.content_type
        );

        let table = ApiTable::from_body(&response.bytes, &self.series_ids, diagnostics)?;
        let series = table.column_series(&self.source_name(), 0, diagnostics);
        if series.is_empty() {
            return Err(IpcError::EmptyResult(format!(
                "no numeric values for series {}",
                self.series_ids[0]
            )));
        }
        Ok(series)
    }
}
