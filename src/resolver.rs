use crate::error::{IpcError, Result};
use crate::series::{CanonicalSeries, MonthKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which end of the analysed period is being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    Start,
    End,
}

/// Where to look when the requested month has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// No fallback; only an exact month satisfies the lookup.
    Exact,
    /// Last known value carried forward.
    OnOrBefore,
    OnOrAfter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverPolicy {
    #[serde(default = "default_fallback")]
    pub start: Fallback,
    #[serde(default = "default_fallback")]
    pub end: Fallback,
}

fn default_fallback() -> Fallback {
    Fallback::OnOrBefore
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            start: Fallback::OnOrBefore,
            end: Fallback::OnOrBefore,
        }
    }
}

impl ResolverPolicy {
    pub fn fallback_for(&self, boundary: Boundary) -> Fallback {
        match boundary {
            Boundary::Start => self.start,
            Boundary::End => self.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Exact,
    NearestBefore,
    NearestAfter,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedValue {
    pub requested: MonthKey,
    pub month: MonthKey,
    pub value: f64,
    pub strategy: Strategy,
}

/// Looks up the index value for `target`, falling back per the boundary's policy.
pub fn resolve(
    series: &CanonicalSeries,
    target: MonthKey,
    boundary: Boundary,
    policy: &ResolverPolicy,
) -> Result<ResolvedValue> {
    if let Some(value) = series.get(target) {
        return Ok(ResolvedValue {
            requested: target,
            month: target,
            value,
            strategy: Strategy::Exact,
        });
    }

    let found = match policy.fallback_for(boundary) {
        Fallback::Exact => None,
        Fallback::OnOrBefore => series
            .on_or_before(target)
            .map(|(month, value)| (month, value, Strategy::NearestBefore)),
        Fallback::OnOrAfter => series
            .on_or_after(target)
            .map(|(month, value)| (month, value, Strategy::NearestAfter)),
    };

    match found {
        Some((month, value, strategy)) => {
            debug!(
                "resolved {:?} boundary {} via {:?} to {}",
                boundary, target, strategy, month
            );
            Ok(ResolvedValue {
                requested: target,
                month,
                value,
                strategy,
            })
        }
        None => Err(IpcError::MonthNotFound(target)),
    }
}
