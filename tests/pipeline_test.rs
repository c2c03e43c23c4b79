use anyhow::Result;
use ipc_tracker::app::ports::{HttpClientPort, HttpGetResult};
use ipc_tracker::app::{CompareUseCase, ComparisonRequest, SourceSelection};
use ipc_tracker::comparator::{Outcome, SalaryPair};
use ipc_tracker::config::Config;
use ipc_tracker::parser::{CsvSeriesParser, SeriesSource};
use ipc_tracker::storage::{FsSeriesStore, SeriesStore};
use ipc_tracker::{ErrorKind, MonthKey};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Serves one canned body and remembers the requested URLs.
struct CannedApi {
    body: String,
    requested: Mutex<Vec<String>>,
}

impl CannedApi {
    fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            requested: Mutex::new(Vec::new()),
        })
    }
}

impl HttpClientPort for CannedApi {
    fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String> {
        self.requested.lock().unwrap().push(url.to_string());
        Ok(HttpGetResult {
            status: 200,
            bytes: self.body.as_bytes().to_vec(),
            content_type: "application/json".to_string(),
        })
    }
}

fn month(raw: &str) -> MonthKey {
    raw.parse().unwrap()
}

const NATIONAL_CPI: &str = r#"{
    "data": [
        ["2024-03-01", 100.0],
        ["2024-09-01", 160.2],
        ["2025-04-01", 218.9]
    ],
    "count": 3,
    "meta": [{"frequency": "month"}]
}"#;

#[test]
fn api_salary_comparison_end_to_end() -> Result<()> {
    let api = CannedApi::new(NATIONAL_CPI);
    let use_case = CompareUseCase::new(Config::default(), api.clone());
    let report = use_case.run(&ComparisonRequest {
        source: SourceSelection::Api,
        start: month("2024-03"),
        end: month("2025-04"),
        salary: SalaryPair {
            start: 354721.79,
            end: 776493.58,
        },
        save_as: None,
    })?;

    let c = &report.comparison;
    assert!((c.inflation_pct - 118.9).abs() < 1e-9);
    let change = c.salary_change_pct.unwrap();
    assert!((change - 118.902137).abs() < 1e-5);
    // exact-equality parity: a 0.002 point lead counts as outpacing
    assert_eq!(c.outcome, Outcome::SalaryOutpacedInflation);
    assert!((c.real_purchasing_power - 354725.2535).abs() < 1e-3);

    let requested = api.requested.lock().unwrap();
    assert_eq!(requested.len(), 1);
    assert!(requested[0].contains("start_date=2023-03-01"));
    assert!(requested[0].contains("end_date=2025-05-01"));
    Ok(())
}

#[test]
fn api_comparison_with_parity_epsilon() -> Result<()> {
    let mut config = Config::default();
    config.comparator.parity_epsilon = 0.01;
    let use_case = CompareUseCase::new(config, CannedApi::new(NATIONAL_CPI));
    let report = use_case.run(&ComparisonRequest {
        source: SourceSelection::Api,
        start: month("2024-03"),
        end: month("2025-04"),
        salary: SalaryPair {
            start: 354721.79,
            end: 776493.58,
        },
        save_as: None,
    })?;
    assert_eq!(report.comparison.outcome, Outcome::Parity);
    Ok(())
}

#[test]
fn api_without_data_rows_reports_empty_result() {
    let api = CannedApi::new(r#"{"data": [], "errors": ["serie inexistente"]}"#);
    let use_case = CompareUseCase::new(Config::default(), api);
    let err = use_case
        .run(&ComparisonRequest {
            source: SourceSelection::Api,
            start: month("2024-03"),
            end: month("2025-04"),
            salary: SalaryPair {
                start: 1.0,
                end: 2.0,
            },
            save_as: None,
        })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyResult);
    assert!(err.to_string().contains("serie inexistente"));
}

#[test]
fn csv_reparse_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ipc-chaco.csv");
    fs::write(
        &path,
        "indice_tiempo,ipc_chaco_historico_ng\n2017-02-01,102.1\n2017-01-01,100.0\n",
    )?;
    let parser = CsvSeriesParser::new(&path, "indice_tiempo", "ipc_chaco_historico_ng");
    let first = parser.load();
    let second = parser.load();
    assert_eq!(first.series, second.series);
    assert_eq!(first.series.len(), 2);
    assert_eq!(first.series.first(), Some((month("2017-01"), 100.0)));
    Ok(())
}

#[test]
fn csv_comparison_saves_to_filesystem_store() -> Result<()> {
    let dir = tempdir()?;
    let csv_path = dir.path().join("ipc.csv");
    fs::write(
        &csv_path,
        "indice_tiempo,ipc_chaco_historico_ng\n2024-01-01,200.0\n2024-02-01,210.0\n",
    )?;
    let mut config = Config::default();
    config.csv.path = csv_path;
    let store_dir = dir.path().join("store");

    let use_case = CompareUseCase::new(config, CannedApi::new("{}"))
        .with_store(Box::new(FsSeriesStore::new(&store_dir)));
    let report = use_case.run(&ComparisonRequest {
        source: SourceSelection::Csv,
        start: month("2024-01"),
        end: month("2024-02"),
        salary: SalaryPair {
            start: 0.0,
            end: 100.0,
        },
        save_as: Some("chaco".to_string()),
    })?;

    assert_eq!(report.comparison.outcome, Outcome::Undetermined);
    assert!(!report.comparison.salary_change_defined);
    assert!(report.stored_as.is_some());
    let saved = FsSeriesStore::new(&store_dir).load("chaco")?;
    assert_eq!(saved.map(|s| s.len()), Some(2));
    Ok(())
}

#[test]
fn every_parser_reports_empty_series_on_failure() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.csv.path = dir.path().join("missing.csv");
    config.spreadsheet.path = dir.path().join("missing.xls");
    let use_case = CompareUseCase::new(config, CannedApi::new(r#"{"unexpected": true}"#));

    for selection in [
        SourceSelection::Api,
        SourceSelection::Csv,
        SourceSelection::parse("excel", None).unwrap(),
    ] {
        let window = ipc_tracker::parser::ApiWindow::for_period(month("2024-01"), month("2024-06"));
        let report = use_case.load_series(selection, window);
        assert!(report.is_failed(), "{} should fail", selection);
        assert!(report.series.is_empty());
        assert_eq!(report.causes().count(), 1, "{} should name one cause", selection);
    }
}

#[test]
fn series_source_is_usable_as_trait_object() {
    let parser: Box<dyn SeriesSource> = Box::new(CsvSeriesParser::new(
        "/definitely/not/here.csv",
        "indice_tiempo",
        "ipc_chaco_historico_ng",
    ));
    assert!(parser.source_name().contains("here.csv"));
}
