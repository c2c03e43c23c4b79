use super::{coerce_number, note_dropped, Diagnostic, SeriesSource};
use crate::error::{IpcError, Result};
use crate::series::{CanonicalSeries, MonthKey, SeriesBuilder};
use ::csv::ReaderBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Historic CPI extract with fixed date and value columns.
pub struct CsvSeriesParser {
    path: PathBuf,
    date_column: String,
    value_column: String,
}

impl CsvSeriesParser {
    pub fn new(
        path: impl Into<PathBuf>,
        date_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            date_column: date_column.into(),
            value_column: value_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses CSV content already in memory.
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<CanonicalSeries> {
        // flexible: short or long rows are counted and dropped, not fatal
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(::csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let position = |column: &str| headers.iter().position(|h| h == column);
        let date_idx = position(&self.date_column).ok_or_else(|| {
            IpcError::MalformedInput(format!("missing date column '{}'", self.date_column))
        })?;
        let value_idx = position(&self.value_column).ok_or_else(|| {
            IpcError::MalformedInput(format!("missing value column '{}'", self.value_column))
        })?;

        let mut points = Vec::new();
        let mut bad_dates = 0usize;
        let mut bad_values = 0usize;
        let mut bad_records = 0usize;
        for (line_num, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    // +2: 1-indexed plus the header row
                    debug!("skipping CSV line {}: {}", line_num + 2, e);
                    bad_records += 1;
                    continue;
                }
            };
            let Some(month) = record.get(date_idx).and_then(MonthKey::parse_date) else {
                bad_dates += 1;
                continue;
            };
            match record.get(value_idx).and_then(coerce_number) {
                Some(value) => points.push((month, value)),
                None => bad_values += 1,
            }
        }
        note_dropped(diagnostics, bad_records, "an unreadable record");
        note_dropped(diagnostics, bad_dates, "an unparseable date");
        note_dropped(diagnostics, bad_values, "a non-numeric index value");

        // stable sort keeps the first row of each month ahead of its repeats
        points.sort_by_key(|(month, _)| *month);
        let mut builder = SeriesBuilder::new(self.source_name());
        for (month, value) in points {
            builder.push(month, value);
        }
        note_dropped(diagnostics, builder.duplicates(), "a repeated month");
        debug!("CSV rows kept={}", builder.len());

        if builder.is_empty() {
            return Err(IpcError::EmptyResult(format!(
                "{} has no rows with a valid date and index value",
                self.path.display()
            )));
        }
        Ok(builder.build())
    }
}

impl SeriesSource for CsvSeriesParser {
    fn source_name(&self) -> String {
        format!("CSV {}", self.path.display())
    }

    fn try_load(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<CanonicalSeries> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            IpcError::SourceUnavailable(format!("CSV file {}: {}", self.path.display(), e))
        })?;
        self.parse_reader(file, diagnostics)
    }
}
