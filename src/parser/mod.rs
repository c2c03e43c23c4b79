pub mod api;
pub mod csv;
pub mod spreadsheet;

use crate::error::{ErrorKind, IpcError, Result};
use crate::series::CanonicalSeries;
use serde::Serialize;
use tracing::{error, info, warn};

pub use self::api::{ApiSeriesParser, ApiWindow};
pub use self::csv::CsvSeriesParser;
pub use self::spreadsheet::{HeaderLayout, Region, RegionTableParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// A cause or warning reported while loading a source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind: None,
            message: message.into(),
        }
    }

    pub fn cause(err: &IpcError) -> Self {
        Self {
            severity: Severity::Error,
            kind: Some(err.kind()),
            message: err.to_string(),
        }
    }
}

/// Output of a source load: always a series (possibly empty) plus what went wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub series: CanonicalSeries,
    pub diagnostics: Vec<Diagnostic>,
}

impl SourceReport {
    pub fn is_failed(&self) -> bool {
        self.series.is_empty()
    }

    pub fn causes(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

/// A raw CPI source that can be turned into a canonical monthly series.
pub trait SeriesSource {
    /// Human-readable name, also used as the series' source tag.
    fn source_name(&self) -> String;

    /// Parses the source, pushing non-fatal findings into `diagnostics`.
    fn try_load(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<CanonicalSeries>;

    /// Loads the source without ever failing: errors become an empty series plus a cause.
    fn load(&self) -> SourceReport {
        let name = self.source_name();
        let span = tracing::info_span!("load_source", source = %name);
        let _enter = span.enter();

        let mut diagnostics = Vec::new();
        let series = match self.try_load(&mut diagnostics) {
            Ok(series) if series.is_empty() => {
                let err = IpcError::EmptyResult(format!("{} produced no data", name));
                warn!("{}", err);
                diagnostics.push(Diagnostic::cause(&err));
                CanonicalSeries::empty(name)
            }
            Ok(series) => {
                info!("Loaded {} monthly values", series.len());
                series
            }
            Err(err) => {
                error!("Failed to load {}: {}", name, err);
                diagnostics.push(Diagnostic::cause(&err));
                CanonicalSeries::empty(name)
            }
        };
        for warning in diagnostics.iter().filter(|d| d.severity == Severity::Warning) {
            warn!("{}", warning.message);
        }
        SourceReport {
            series,
            diagnostics,
        }
    }
}

/// Numeric coercion for text cells: trimmed, finite, otherwise absent.
pub(crate) fn coerce_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Pushes a warning when `count` rows were discarded for `reason`.
pub(crate) fn note_dropped(diagnostics: &mut Vec<Diagnostic>, count: usize, reason: &str) {
    if count > 0 {
        diagnostics.push(Diagnostic::warning(format!(
            "Dropped {} row(s) with {}",
            count, reason
        )));
    }
}
