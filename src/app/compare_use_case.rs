use crate::app::ports::HttpClientPort;
use crate::comparator::{compare, ComparisonResult, SalaryPair};
use crate::config::{Config, StartAnchor};
use crate::error::{IpcError, Result};
use crate::parser::{
    ApiSeriesParser, ApiWindow, CsvSeriesParser, Diagnostic, Region, RegionTableParser,
    SeriesSource, SourceReport,
};
use crate::resolver::{resolve, Boundary};
use crate::series::{CanonicalSeries, MonthKey};
use crate::storage::SeriesStore;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Which CPI source a run reads from. One source per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelection {
    Api,
    Csv,
    Spreadsheet(Region),
}

impl SourceSelection {
    /// Parses `api`, `csv` or `excel`; the spreadsheet defaults to the national table.
    pub fn parse(source: &str, region: Option<Region>) -> Result<Self> {
        match source.trim().to_lowercase().as_str() {
            crate::constants::API_SOURCE => Ok(SourceSelection::Api),
            crate::constants::CSV_SOURCE => Ok(SourceSelection::Csv),
            crate::constants::SPREADSHEET_SOURCE => Ok(SourceSelection::Spreadsheet(
                region.unwrap_or(Region::TotalNacional),
            )),
            other => Err(IpcError::Config(format!(
                "unknown source '{}', expected one of {:?}",
                other,
                crate::constants::get_supported_sources()
            ))),
        }
    }
}

impl FromStr for SourceSelection {
    type Err = IpcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, None)
    }
}

impl fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelection::Api => f.write_str(crate::constants::API_SOURCE),
            SourceSelection::Csv => f.write_str(crate::constants::CSV_SOURCE),
            SourceSelection::Spreadsheet(region) => {
                write!(f, "{} ({})", crate::constants::SPREADSHEET_SOURCE, region)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonRequest {
    pub source: SourceSelection,
    pub start: MonthKey,
    pub end: MonthKey,
    pub salary: SalaryPair,
    /// Store the loaded series under this name when a store is configured.
    pub save_as: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub source: String,
    pub series_len: usize,
    pub comparison: ComparisonResult,
    pub stored_as: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Use case for comparing a salary change against inflation from one CPI source
pub struct CompareUseCase {
    config: Config,
    http: Arc<dyn HttpClientPort>,
    store: Option<Box<dyn SeriesStore>>,
}

impl CompareUseCase {
    pub fn new(config: Config, http: Arc<dyn HttpClientPort>) -> Self {
        Self {
            config,
            http,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn SeriesStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the parser for `selection`; `api_window` is only used by the API source.
    pub fn source_for(
        &self,
        selection: SourceSelection,
        api_window: ApiWindow,
    ) -> Box<dyn SeriesSource> {
        match selection {
            SourceSelection::Api => Box::new(ApiSeriesParser::new(
                self.http.clone(),
                self.config.api.base_url.clone(),
                vec![self.config.api.series_id.clone()],
                api_window,
            )),
            SourceSelection::Csv => Box::new(CsvSeriesParser::new(
                self.config.csv.path.clone(),
                self.config.csv.date_column.clone(),
                self.config.csv.value_column.clone(),
            )),
            SourceSelection::Spreadsheet(region) => {
                Box::new(RegionTableParser::new(&self.config.spreadsheet, region))
            }
        }
    }

    /// Loads a source on its own, as used for the series summary.
    pub fn load_series(&self, selection: SourceSelection, api_window: ApiWindow) -> SourceReport {
        self.source_for(selection, api_window).load()
    }

    /// Month whose index is the base of the comparison.
    fn start_target(&self, start: MonthKey) -> MonthKey {
        match self.config.resolver.start_anchor {
            StartAnchor::SameMonth => start,
            StartAnchor::PreviousMonth => start.pred(),
        }
    }

    /// Runs load, resolve start, resolve end, compare.
    pub fn run(&self, request: &ComparisonRequest) -> Result<AnalysisReport> {
        let span = tracing::info_span!("compare", source = %request.source);
        let _enter = span.enter();

        let start_target = self.start_target(request.start);
        let window = ApiWindow::for_period(start_target, request.end);
        let report = self.load_series(request.source, window);
        let SourceReport {
            series,
            mut diagnostics,
        } = report;
        if series.is_empty() {
            return Err(load_failure(&series, &diagnostics));
        }

        let policy = self.config.resolver.policy();
        let start = resolve(&series, start_target, Boundary::Start, &policy)?;
        let end = resolve(&series, request.end, Boundary::End, &policy)?;
        let comparison = compare(
            start,
            end,
            request.salary,
            self.config.comparator.parity_epsilon,
        )?;
        info!(
            "Inflation {:.3}% vs salary change {:?}: {}",
            comparison.inflation_pct,
            comparison.salary_change_pct,
            comparison.outcome.describe()
        );

        let stored_as = self.save(request.save_as.as_deref(), &series, &mut diagnostics);
        Ok(AnalysisReport {
            source: series.source().to_string(),
            series_len: series.len(),
            comparison,
            stored_as,
            diagnostics,
        })
    }

    fn save(
        &self,
        name: Option<&str>,
        series: &CanonicalSeries,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<String> {
        let (Some(store), Some(name)) = (self.store.as_ref(), name) else {
            return None;
        };
        match store.save(name, series) {
            Ok(reference) => {
                info!("Saved series '{}' as {}", name, reference);
                Some(reference)
            }
            Err(e) => {
                // the comparison already succeeded, a failed save only warns
                warn!("Failed to save series '{}': {}", name, e);
                diagnostics.push(Diagnostic::warning(format!(
                    "series '{}' was not saved: {}",
                    name, e
                )));
                None
            }
        }
    }
}

fn load_failure(series: &CanonicalSeries, diagnostics: &[Diagnostic]) -> IpcError {
    let causes: Vec<&Diagnostic> = diagnostics.iter().filter(|d| d.kind.is_some()).collect();
    let kind = causes
        .first()
        .and_then(|d| d.kind)
        .unwrap_or(crate::error::ErrorKind::EmptyResult);
    let message = causes
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    IpcError::SourceFailed {
        source_name: series.source().to_string(),
        kind,
        message,
    }
}
