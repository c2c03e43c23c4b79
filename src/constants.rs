/// Source names used on the command line and as default store keys
pub const API_SOURCE: &str = "api";
pub const CSV_SOURCE: &str = "csv";
pub const SPREADSHEET_SOURCE: &str = "excel";

// Time series API (datos.gob.ar)
pub const API_BASE_URL: &str = "https://apis.datos.gob.ar/series/api/series";
/// National headline CPI, base December 2016
pub const NATIONAL_CPI_SERIES_ID: &str = "101.1_I2NG_2016_M_22";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
/// Earliest month the API is queried from (base month of the 2016 index)
pub const API_EARLIEST_YEAR: i32 = 2016;
pub const API_EARLIEST_MONTH: u32 = 12;
/// Months of publication lag assumed when querying the latest data
pub const PUBLICATION_LAG_MONTHS: i32 = 2;
pub const LATEST_WINDOW_MONTHS: i32 = 14;

// CSV extract
pub const DEFAULT_CSV_PATH: &str = "data/ipc-chaco-historico.csv";
pub const CSV_DATE_COLUMN: &str = "indice_tiempo";
pub const CSV_VALUE_COLUMN: &str = "ipc_chaco_historico_ng";

// Regional spreadsheet
pub const DEFAULT_SPREADSHEET_PATH: &str = "data/sh_ipc.xls";
pub const VARIATION_SHEET_NAME: &str = "Variación mensual IPC Nacional";
pub const HEADLINE_LABEL: &str = "Nivel general";

// Configuration and storage
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "IPC_CONFIG";
pub const DEFAULT_STORE_DIR: &str = "output/series";

/// Get all supported source names
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![API_SOURCE, CSV_SOURCE, SPREADSHEET_SOURCE]
}
