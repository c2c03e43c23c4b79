use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A calendar month with no day component; the lookup unit for every series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction, day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn add_months(&self, delta: i32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: zero_based.div_euclid(12),
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn pred(&self) -> Self {
        self.add_months(-1)
    }

    pub fn succ(&self) -> Self {
        self.add_months(1)
    }

    /// Truncates an ISO-ish date string to its month.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[...]`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM`.
    pub fn parse_date(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Self::from_date(&date));
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(Self::from_date(&dt.naive_local()));
        }
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Some(Self::from_date(&dt));
            }
        }
        let (year, month) = s.split_once('-')?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_date(s).ok_or_else(|| format!("invalid month '{}', expected YYYY-MM", s))
    }
}

impl From<MonthKey> for String {
    fn from(month: MonthKey) -> Self {
        month.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Monthly index values from one source, sorted by month and never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSeries {
    source: String,
    values: BTreeMap<MonthKey, f64>,
}

impl CanonicalSeries {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builds a series keeping the first finite value seen for each month.
    pub fn from_points<I>(source: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (MonthKey, f64)>,
    {
        let mut builder = SeriesBuilder::new(source);
        for (month, value) in points {
            builder.push(month, value);
        }
        builder.build()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, month: MonthKey) -> Option<f64> {
        self.values.get(&month).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MonthKey, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn first(&self) -> Option<(MonthKey, f64)> {
        self.values.iter().next().map(|(m, v)| (*m, *v))
    }

    pub fn last(&self) -> Option<(MonthKey, f64)> {
        self.values.iter().next_back().map(|(m, v)| (*m, *v))
    }

    /// Latest entry at or before `month`.
    pub fn on_or_before(&self, month: MonthKey) -> Option<(MonthKey, f64)> {
        self.values.range(..=month).next_back().map(|(m, v)| (*m, *v))
    }

    /// Earliest entry at or after `month`.
    pub fn on_or_after(&self, month: MonthKey) -> Option<(MonthKey, f64)> {
        self.values.range(month..).next().map(|(m, v)| (*m, *v))
    }

    pub fn summary(&self) -> Option<SeriesSummary> {
        let (first_month, _) = self.first()?;
        let (last_month, _) = self.last()?;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for value in self.values.values() {
            min = min.min(*value);
            max = max.max(*value);
            sum += value;
        }
        Some(SeriesSummary {
            count: self.len(),
            first_month,
            last_month,
            min,
            max,
            mean: sum / self.len() as f64,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub first_month: MonthKey,
    pub last_month: MonthKey,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Month-over-month percentage changes (1.8 means +1.8%), sorted by month.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariationSeries {
    values: BTreeMap<MonthKey, f64>,
}

impl VariationSeries {
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (MonthKey, f64)>,
    {
        let mut builder = SeriesBuilder::new("variations");
        for (month, delta) in points {
            builder.push(month, delta);
        }
        builder.build_variations()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ascending by month.
    pub fn iter(&self) -> impl Iterator<Item = (MonthKey, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }
}

/// Accumulates points for a series, applying the first-wins and finite-only rules.
#[derive(Debug)]
pub struct SeriesBuilder {
    source: String,
    values: BTreeMap<MonthKey, f64>,
    duplicates: usize,
    non_finite: usize,
}

impl SeriesBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            values: BTreeMap::new(),
            duplicates: 0,
            non_finite: 0,
        }
    }

    /// Returns false when the point was rejected.
    pub fn push(&mut self, month: MonthKey, value: f64) -> bool {
        if !value.is_finite() {
            self.non_finite += 1;
            return false;
        }
        if self.values.contains_key(&month) {
            self.duplicates += 1;
            return false;
        }
        self.values.insert(month, value);
        true
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn non_finite(&self) -> usize {
        self.non_finite
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn build(self) -> CanonicalSeries {
        CanonicalSeries {
            source: self.source,
            values: self.values,
        }
    }

    pub fn build_variations(self) -> VariationSeries {
        VariationSeries {
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    #[test]
    fn month_key_parses_common_date_encodings() {
        assert_eq!(MonthKey::parse_date("2024-03-01"), Some(m(2024, 3)));
        assert_eq!(MonthKey::parse_date("2024-03-17T00:00:00"), Some(m(2024, 3)));
        assert_eq!(MonthKey::parse_date("2024-03-17 12:30:00"), Some(m(2024, 3)));
        assert_eq!(MonthKey::parse_date("2024-03-17T00:00:00-03:00"), Some(m(2024, 3)));
        assert_eq!(MonthKey::parse_date(" 2024-3 "), Some(m(2024, 3)));
        assert_eq!(MonthKey::parse_date("2024-13"), None);
        assert_eq!(MonthKey::parse_date("marzo"), None);
        assert_eq!(MonthKey::parse_date(""), None);
    }

    #[test]
    fn month_arithmetic_crosses_year_boundaries() {
        assert_eq!(m(2024, 1).pred(), m(2023, 12));
        assert_eq!(m(2023, 12).succ(), m(2024, 1));
        assert_eq!(m(2024, 3).add_months(-12), m(2023, 3));
        assert_eq!(m(2024, 3).add_months(-15), m(2022, 12));
        assert_eq!(m(2024, 3).first_day(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn month_key_displays_and_serializes_as_year_month() {
        assert_eq!(m(2025, 4).to_string(), "2025-04");
        let json = serde_json::to_string(&m(2025, 4)).unwrap();
        assert_eq!(json, "\"2025-04\"");
        let back: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m(2025, 4));
    }

    #[test]
    fn series_keeps_first_value_and_drops_non_finite() {
        let series = CanonicalSeries::from_points(
            "test",
            vec![
                (m(2024, 2), 101.8),
                (m(2024, 1), 100.0),
                (m(2024, 2), 999.0),
                (m(2024, 3), f64::NAN),
            ],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(m(2024, 2)), Some(101.8));
        assert_eq!(series.get(m(2024, 3)), None);
        let months: Vec<_> = series.iter().map(|(month, _)| month).collect();
        assert_eq!(months, vec![m(2024, 1), m(2024, 2)]);
    }

    #[test]
    fn neighbour_lookups_respect_direction() {
        let series =
            CanonicalSeries::from_points("test", vec![(m(2024, 1), 100.0), (m(2024, 4), 104.0)]);
        assert_eq!(series.on_or_before(m(2024, 3)), Some((m(2024, 1), 100.0)));
        assert_eq!(series.on_or_after(m(2024, 3)), Some((m(2024, 4), 104.0)));
        assert_eq!(series.on_or_before(m(2023, 12)), None);
        assert_eq!(series.on_or_after(m(2024, 5)), None);
    }

    #[test]
    fn summary_describes_the_series() {
        let series = CanonicalSeries::from_points(
            "test",
            vec![(m(2024, 1), 100.0), (m(2024, 2), 110.0), (m(2024, 3), 120.0)],
        );
        let summary = series.summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.first_month, m(2024, 1));
        assert_eq!(summary.last_month, m(2024, 3));
        assert_eq!(summary.min, 100.0);
        assert_eq!(summary.max, 120.0);
        assert!((summary.mean - 110.0).abs() < 1e-9);
        assert!(CanonicalSeries::empty("none").summary().is_none());
    }
}
