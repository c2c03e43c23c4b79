pub mod comparator;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod parser;
pub mod reconstruct;
pub mod resolver;
pub mod series;
pub mod storage;

// Application layer and its infrastructure adapters
pub mod app;
pub mod infra;

pub use comparator::{compare, ComparisonResult, Outcome, SalaryPair};
pub use error::{ErrorKind, IpcError, Result};
pub use reconstruct::reconstruct_index;
pub use resolver::{resolve, Boundary, Fallback, ResolvedValue, ResolverPolicy};
pub use series::{CanonicalSeries, MonthKey, SeriesSummary, VariationSeries};
