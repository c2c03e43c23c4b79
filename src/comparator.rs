use crate::error::{IpcError, Result};
use crate::resolver::ResolvedValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryPair {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    SalaryOutpacedInflation,
    SalaryTrailedInflation,
    Parity,
    /// Salary change could not be computed (start salary of zero).
    Undetermined,
}

impl Outcome {
    pub fn describe(&self) -> &'static str {
        match self {
            Outcome::SalaryOutpacedInflation => "salary outpaced inflation",
            Outcome::SalaryTrailedInflation => "salary trailed inflation",
            Outcome::Parity => "salary kept pace with inflation",
            Outcome::Undetermined => "salary change undefined (start salary is zero)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub start: ResolvedValue,
    pub end: ResolvedValue,
    pub inflation_pct: f64,
    /// `None` when the start salary is zero.
    pub salary_change_pct: Option<f64>,
    pub salary_change_defined: bool,
    /// End salary expressed in money of the start month.
    pub real_purchasing_power: f64,
    /// Salary change minus inflation, in percentage points.
    pub gap_points: Option<f64>,
    pub outcome: Outcome,
}

/// Compounded inflation between two resolved index values, compared to a salary change.
///
/// `parity_epsilon` is the largest gap (in percentage points) still reported as parity;
/// zero means exact floating-point equality.
pub fn compare(
    start: ResolvedValue,
    end: ResolvedValue,
    salary: SalaryPair,
    parity_epsilon: f64,
) -> Result<ComparisonResult> {
    if start.value == 0.0 {
        return Err(IpcError::DivisionByZero);
    }
    let ratio = end.value / start.value;
    let inflation_pct = (ratio - 1.0) * 100.0;
    let real_purchasing_power = salary.end / ratio;

    let salary_change_pct = if salary.start != 0.0 {
        Some((salary.end - salary.start) / salary.start * 100.0)
    } else {
        None
    };
    let gap_points = salary_change_pct.map(|change| change - inflation_pct);
    let outcome = match gap_points {
        None => Outcome::Undetermined,
        Some(gap) if gap.abs() <= parity_epsilon => Outcome::Parity,
        Some(gap) if gap > 0.0 => Outcome::SalaryOutpacedInflation,
        Some(_) => Outcome::SalaryTrailedInflation,
    };

    Ok(ComparisonResult {
        start,
        end,
        inflation_pct,
        salary_change_defined: salary_change_pct.is_some(),
        salary_change_pct,
        real_purchasing_power,
        gap_points,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resolver::Strategy;
    use crate::series::MonthKey;

    fn value(year: i32, month: u32, value: f64) -> ResolvedValue {
        let month = MonthKey::new(year, month).unwrap();
        ResolvedValue {
            requested: month,
            month,
            value,
            strategy: Strategy::Exact,
        }
    }

    #[test]
    fn zero_start_index_is_division_by_zero() {
        let err = compare(
            value(2024, 1, 0.0),
            value(2024, 6, 120.0),
            SalaryPair { start: 100.0, end: 120.0 },
            0.0,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DivisionByZero);
    }

    #[test]
    fn zero_start_salary_still_reports_inflation() {
        let result = compare(
            value(2024, 1, 100.0),
            value(2024, 6, 150.0),
            SalaryPair { start: 0.0, end: 1000.0 },
            0.0,
        )
        .unwrap();
        assert!(!result.salary_change_defined);
        assert_eq!(result.salary_change_pct, None);
        assert_eq!(result.gap_points, None);
        assert_eq!(result.outcome, Outcome::Undetermined);
        assert!((result.inflation_pct - 50.0).abs() < 1e-9);
        assert!((result.real_purchasing_power - 1000.0 / 1.5).abs() < 1e-9);
    }

    #[test]
    fn salary_against_inflation_scenario() {
        let result = compare(
            value(2024, 3, 100.0),
            value(2025, 4, 218.9),
            SalaryPair { start: 354721.79, end: 776493.58 },
            0.0,
        )
        .unwrap();
        assert!((result.inflation_pct - 118.9).abs() < 1e-9);
        let change = result.salary_change_pct.unwrap();
        assert!((change - 118.902137).abs() < 1e-5);
        // the two figures are only 0.002 points apart
        assert!((result.gap_points.unwrap() - 0.002137).abs() < 1e-5);
        assert_eq!(result.outcome, Outcome::SalaryOutpacedInflation);
        assert!((result.real_purchasing_power - 776493.58 / 2.189).abs() < 1e-6);
    }

    #[test]
    fn epsilon_widens_parity_band() {
        let start = value(2024, 3, 100.0);
        let end = value(2025, 4, 218.9);
        let salary = SalaryPair { start: 354721.79, end: 776493.58 };
        let strict = compare(start, end, salary, 0.0).unwrap();
        let tolerant = compare(start, end, salary, 0.01).unwrap();
        assert_eq!(strict.outcome, Outcome::SalaryOutpacedInflation);
        assert_eq!(tolerant.outcome, Outcome::Parity);
    }

    #[test]
    fn trailing_and_exact_parity() {
        let start = value(2024, 1, 100.0);
        let end = value(2024, 12, 200.0);
        let trailed = compare(start, end, SalaryPair { start: 100.0, end: 150.0 }, 0.0).unwrap();
        assert_eq!(trailed.outcome, Outcome::SalaryTrailedInflation);
        assert!((trailed.gap_points.unwrap() + 50.0).abs() < 1e-9);

        let level = compare(start, end, SalaryPair { start: 100.0, end: 200.0 }, 0.0).unwrap();
        assert_eq!(level.outcome, Outcome::Parity);
    }
}
