use crate::constants;
use crate::error::{IpcError, Result};
use crate::parser::spreadsheet::{HeaderLayout, Region};
use crate::resolver::{Fallback, ResolverPolicy};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub csv: CsvConfig,
    pub spreadsheet: SpreadsheetConfig,
    pub resolver: ResolverConfig,
    pub comparator: ComparatorConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub series_id: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: constants::API_BASE_URL.to_string(),
            series_id: constants::NATIONAL_CPI_SERIES_ID.to_string(),
            timeout_seconds: constants::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub path: PathBuf,
    pub date_column: String,
    pub value_column: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_CSV_PATH),
            date_column: constants::CSV_DATE_COLUMN.to_string(),
            value_column: constants::CSV_VALUE_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpreadsheetConfig {
    pub path: PathBuf,
    pub sheet_name: String,
    pub headline_label: String,
    pub layout: HeaderLayout,
    /// Region name to the title text used in column A of the sheet.
    pub regions: BTreeMap<String, String>,
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_SPREADSHEET_PATH),
            sheet_name: constants::VARIATION_SHEET_NAME.to_string(),
            headline_label: constants::HEADLINE_LABEL.to_string(),
            layout: HeaderLayout::TitleRow,
            regions: Region::all()
                .iter()
                .map(|r| (r.name().to_string(), r.default_label().to_string()))
                .collect(),
        }
    }
}

impl SpreadsheetConfig {
    /// Rewrites region keys given as slugs or menu numbers (`gba`, `2`) to the region name.
    pub fn canonicalize_regions(&mut self) -> Result<()> {
        let mut regions = BTreeMap::new();
        for (key, label) in std::mem::take(&mut self.regions) {
            let region = key.parse::<Region>().map_err(|_| {
                IpcError::Config(format!("spreadsheet.regions has unknown region '{}'", key))
            })?;
            if regions.insert(region.name().to_string(), label).is_some() {
                return Err(IpcError::Config(format!(
                    "spreadsheet.regions names '{}' more than once",
                    region.name()
                )));
            }
        }
        self.regions = regions;
        Ok(())
    }

    /// Sheet label for a region; regions missing from the map use their built-in label.
    pub fn label_for(&self, region: Region) -> String {
        self.regions
            .get(region.name())
            .cloned()
            .unwrap_or_else(|| region.default_label().to_string())
    }
}

/// How the start boundary of a period maps to an index month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StartAnchor {
    /// Index of the start month itself.
    #[default]
    SameMonth,
    /// Index of the month before the start, so the start month's own change is counted.
    PreviousMonth,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub start: Fallback,
    pub end: Fallback,
    pub start_anchor: StartAnchor,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let policy = ResolverPolicy::default();
        Self {
            start: policy.start,
            end: policy.end,
            start_anchor: StartAnchor::SameMonth,
        }
    }
}

impl ResolverConfig {
    pub fn policy(&self) -> ResolverPolicy {
        ResolverPolicy {
            start: self.start,
            end: self.end,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    pub parity_epsilon: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(constants::DEFAULT_STORE_DIR),
        }
    }
}

impl Config {
    /// Loads `config.toml` (or the file named by `IPC_CONFIG`); a missing file means defaults.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(constants::CONFIG_PATH_ENV)
            .unwrap_or_else(|_| constants::DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path).map_err(|e| {
            IpcError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.spreadsheet.canonicalize_regions()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let epsilon = self.comparator.parity_epsilon;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(IpcError::Config(format!(
                "comparator.parity_epsilon must be a non-negative number, got {}",
                epsilon
            )));
        }
        if self.api.series_id.trim().is_empty() {
            return Err(IpcError::Config("api.series_id must not be empty".to_string()));
        }
        if self.api.timeout_seconds == 0 {
            return Err(IpcError::Config("api.timeout_seconds must be positive".to_string()));
        }
        if self.csv.date_column.is_empty() || self.csv.value_column.is_empty() {
            return Err(IpcError::Config("csv column names must not be empty".to_string()));
        }
        for name in self.spreadsheet.regions.keys() {
            if !Region::all().iter().any(|r| r.name() == name) {
                return Err(IpcError::Config(format!(
                    "spreadsheet.regions has unknown region '{}'",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.api.series_id, constants::NATIONAL_CPI_SERIES_ID);
        assert_eq!(config.csv.date_column, "indice_tiempo");
        assert_eq!(config.csv.value_column, "ipc_chaco_historico_ng");
        assert_eq!(config.spreadsheet.sheet_name, "Variación mensual IPC Nacional");
        assert_eq!(config.spreadsheet.layout, HeaderLayout::TitleRow);
        assert_eq!(config.resolver.policy(), ResolverPolicy::default());
        assert_eq!(config.comparator.parity_epsilon, 0.0);
        assert_eq!(config.spreadsheet.label_for(Region::TotalNacional), "Total País");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml_str(
            r#"
            [api]
            timeout_seconds = 5

            [spreadsheet]
            layout = "row_below_title"

            [spreadsheet.regions]
            "Total Nacional" = "TOTAL NACIONAL"

            [resolver]
            start = "on_or_after"
            start_anchor = "previous_month"

            [comparator]
            parity_epsilon = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.api.timeout_seconds, 5);
        assert_eq!(config.api.base_url, constants::API_BASE_URL);
        assert_eq!(config.spreadsheet.layout, HeaderLayout::RowBelowTitle);
        assert_eq!(config.spreadsheet.label_for(Region::TotalNacional), "TOTAL NACIONAL");
        assert_eq!(config.spreadsheet.label_for(Region::Cuyo), "Región Cuyo");
        assert_eq!(config.resolver.start, Fallback::OnOrAfter);
        assert_eq!(config.resolver.end, Fallback::OnOrBefore);
        assert_eq!(config.resolver.start_anchor, StartAnchor::PreviousMonth);
        assert_eq!(config.comparator.parity_epsilon, 0.05);
    }

    #[test]
    fn negative_epsilon_is_rejected() {
        let err = Config::from_toml_str("[comparator]\nparity_epsilon = -1.0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn unknown_region_is_rejected() {
        let err =
            Config::from_toml_str("[spreadsheet.regions]\n\"Atlantis\" = \"x\"\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn region_keys_accept_slugs_and_numbers() {
        let config = Config::from_toml_str(
            "[spreadsheet.regions]\ngba = \"REGION GBA CUSTOM\"\n\"6\" = \"CUYO\"\n",
        )
        .unwrap();
        assert_eq!(config.spreadsheet.label_for(Region::Gba), "REGION GBA CUSTOM");
        assert_eq!(config.spreadsheet.label_for(Region::Cuyo), "CUYO");
        assert_eq!(config.spreadsheet.label_for(Region::Noreste), "Región Noreste");
    }

    #[test]
    fn same_region_twice_is_rejected() {
        let err = Config::from_toml_str(
            "[spreadsheet.regions]\ngba = \"a\"\n\"Región GBA\" = \"b\"\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store.dir, PathBuf::from(constants::DEFAULT_STORE_DIR));
    }
}
