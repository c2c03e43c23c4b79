use super::{coerce_number, note_dropped, Diagnostic, SeriesSource};
use crate::config::SpreadsheetConfig;
use crate::error::{IpcError, Result};
use crate::reconstruct::reconstruct_index;
use crate::series::{CanonicalSeries, MonthKey, SeriesBuilder, VariationSeries};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info};

/// The seven regional tables published in the variation workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    TotalNacional,
    Gba,
    Pampeana,
    Noroeste,
    Noreste,
    Cuyo,
    Patagonia,
}

impl Region {
    pub fn all() -> &'static [Region] {
        &[
            Region::TotalNacional,
            Region::Gba,
            Region::Pampeana,
            Region::Noroeste,
            Region::Noreste,
            Region::Cuyo,
            Region::Patagonia,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Region::TotalNacional => "Total Nacional",
            Region::Gba => "Región GBA",
            Region::Pampeana => "Región Pampeana",
            Region::Noroeste => "Región Noroeste",
            Region::Noreste => "Región Noreste",
            Region::Cuyo => "Región Cuyo",
            Region::Patagonia => "Región Patagonia",
        }
    }

    /// Title of the region's block in column A of the sheet.
    pub fn default_label(&self) -> &'static str {
        match self {
            Region::TotalNacional => "Total País",
            other => other.name(),
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            Region::TotalNacional => "nacional",
            Region::Gba => "gba",
            Region::Pampeana => "pampeana",
            Region::Noroeste => "noroeste",
            Region::Noreste => "noreste",
            Region::Cuyo => "cuyo",
            Region::Patagonia => "patagonia",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = String;

    /// Accepts the full name, a short slug (`gba`, `cuyo`, ...) or the menu number 1-7.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        if let Ok(choice) = wanted.parse::<usize>() {
            if (1..=Region::all().len()).contains(&choice) {
                return Ok(Region::all()[choice - 1]);
            }
        }
        Region::all()
            .iter()
            .copied()
            .find(|r| r.name().to_lowercase() == wanted || r.slug() == wanted)
            .ok_or_else(|| format!("unknown region '{}'", s))
    }
}

/// Where the month labels of a region block sit relative to its title row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderLayout {
    /// Months are on the title row itself.
    TitleRow,
    /// Months are on the next non-empty row after the title.
    RowBelowTitle,
}

/// An untyped worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn matches_label(&self, label: &str) -> bool {
        match self {
            Cell::Text(text) => text.trim().to_lowercase() == label.trim().to_lowercase(),
            _ => false,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(text) => coerce_number(text),
            _ => None,
        }
    }

    fn as_month(&self) -> Option<MonthKey> {
        match self {
            Cell::Date(date) => Some(MonthKey::from_date(date)),
            Cell::Number(serial) => excel_serial_month(*serial),
            Cell::Text(text) => parse_month_label(text),
            Cell::Empty => None,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(|d| Cell::Date(d.date()))
                .unwrap_or(Cell::Number(dt.as_f64())),
            Data::DateTimeIso(s) => s
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .map(Cell::Date)
                .unwrap_or_else(|| Cell::Text(s.clone())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

const MONTH_ABBREVIATIONS: [(&str, u32); 17] = [
    ("ene", 1),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("abr", 4),
    ("apr", 4),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("aug", 8),
    ("sep", 9),
    ("set", 9),
    ("oct", 10),
    ("nov", 11),
    ("dic", 12),
    ("dec", 12),
];

fn month_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([a-záéíóúñ]{3,10})\.?\s*[-/ ]\s*(\d{2}|\d{4})$")
            .expect("month label pattern is valid")
    })
}

/// Parses month headers such as `ene-17`, `Dic-24`, `sep.-19`, `marzo 2020` or `2024-03`.
pub fn parse_month_label(raw: &str) -> Option<MonthKey> {
    let label = raw.trim().trim_end_matches('*').trim().to_lowercase();
    if let Some(caps) = month_label_regex().captures(&label) {
        let word = caps.get(1)?.as_str();
        let prefix: String = word.chars().take(3).collect();
        let month = MONTH_ABBREVIATIONS
            .iter()
            .find(|(abbr, _)| *abbr == prefix)
            .map(|(_, month)| *month)?;
        let digits = caps.get(2)?.as_str();
        let year: i32 = digits.parse().ok()?;
        let year = if digits.len() == 2 { 2000 + year } else { year };
        return MonthKey::new(year, month);
    }
    MonthKey::parse_date(&label)
}

/// Excel stores unformatted dates as days since 1899-12-30.
fn excel_serial_month(serial: f64) -> Option<MonthKey> {
    // 1950-01-01 .. 2100-01-01, anything else is a plain number
    if !(18264.0..=73051.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(serial.trunc() as i64))?;
    Some(MonthKey::from_date(&date))
}

/// Extracts one region's headline month-over-month variations from a sheet grid.
pub fn parse_region_grid(
    grid: &[Vec<Cell>],
    region_label: &str,
    headline_label: &str,
    layout: HeaderLayout,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<VariationSeries> {
    let rows: Vec<&Vec<Cell>> = grid
        .iter()
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect();
    let first_cell_is = |row: &Vec<Cell>, label: &str| {
        row.first().map(|c| c.matches_label(label)).unwrap_or(false)
    };

    let title_idx = rows
        .iter()
        .position(|row| first_cell_is(row, region_label))
        .ok_or_else(|| {
            IpcError::MalformedInput(format!("missing region title '{}' in column A", region_label))
        })?;
    let month_idx = match layout {
        HeaderLayout::TitleRow => title_idx,
        HeaderLayout::RowBelowTitle => title_idx + 1,
    };
    if month_idx >= rows.len() {
        return Err(IpcError::MalformedInput(format!(
            "missing month header row below '{}'",
            region_label
        )));
    }
    let value_idx = rows[month_idx + 1..]
        .iter()
        .position(|row| first_cell_is(row, headline_label))
        .map(|offset| month_idx + 1 + offset)
        .ok_or_else(|| {
            IpcError::MalformedInput(format!(
                "missing '{}' row for region '{}'",
                headline_label, region_label
            ))
        })?;
    debug!(
        "region '{}' title_row={} month_row={} value_row={}",
        region_label, title_idx, month_idx, value_idx
    );

    let labels = rows[month_idx].get(1..).unwrap_or(&[]);
    let values = rows[value_idx].get(1..).unwrap_or(&[]);
    let mut builder = SeriesBuilder::new(region_label);
    let mut bad_labels = 0usize;
    let mut bad_values = 0usize;
    // zip truncates to the shorter row; columns pair up by position
    for (label, value) in labels.iter().zip(values.iter()) {
        if label.is_empty() && value.is_empty() {
            continue;
        }
        let Some(month) = label.as_month() else {
            bad_labels += 1;
            continue;
        };
        match value.as_number() {
            Some(delta) => {
                builder.push(month, delta);
            }
            None => bad_values += 1,
        }
    }
    note_dropped(diagnostics, bad_labels, "an unparseable month label");
    note_dropped(diagnostics, bad_values, "a non-numeric variation");
    note_dropped(diagnostics, builder.duplicates(), "a repeated month");

    if builder.is_empty() {
        return Err(IpcError::EmptyResult(format!(
            "no month/variation pairs for region '{}'",
            region_label
        )));
    }
    Ok(builder.build_variations())
}

/// Reads a worksheet into an untyped grid.
pub fn read_grid(path: &std::path::Path, sheet_name: &str) -> Result<Vec<Vec<Cell>>> {
    if !path.exists() {
        return Err(IpcError::SourceUnavailable(format!(
            "spreadsheet {} not found",
            path.display()
        )));
    }
    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
        return Err(IpcError::MalformedInput(format!(
            "missing worksheet '{}' in {}",
            sheet_name,
            path.display()
        )));
    }
    let range = workbook.worksheet_range(sheet_name)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

/// Regional CPI rebuilt from the workbook's monthly variation tables.
pub struct RegionTableParser {
    path: PathBuf,
    sheet_name: String,
    region: Region,
    region_label: String,
    headline_label: String,
    layout: HeaderLayout,
}

impl RegionTableParser {
    pub fn new(config: &SpreadsheetConfig, region: Region) -> Self {
        Self {
            path: config.path.clone(),
            sheet_name: config.sheet_name.clone(),
            region,
            region_label: config.label_for(region),
            headline_label: config.headline_label.clone(),
            layout: config.layout,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Runs the region extraction and index reconstruction over an in-memory grid.
    pub fn parse_grid(
        &self,
        grid: &[Vec<Cell>],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<CanonicalSeries> {
        let variations = parse_region_grid(
            grid,
            &self.region_label,
            &self.headline_label,
            self.layout,
            diagnostics,
        )?;
        info!(
            "Region '{}' yielded {} monthly variations",
            self.region_label,
            variations.len()
        );
        let series = reconstruct_index(&self.source_name(), &variations);
        note_dropped(
            diagnostics,
            variations.len() - series.len(),
            "an index level that overflowed",
        );
        Ok(series)
    }
}

impl SeriesSource for RegionTableParser {
    fn source_name(&self) -> String {
        format!("Spreadsheet {} - {}", self.path.display(), self.region)
    }

    fn try_load(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<CanonicalSeries> {
        let grid = read_grid(&self.path, &self.sheet_name)?;
        self.parse_grid(&grid, diagnostics)
    }
}
