//! Integration tests for the harvest flow.
//!
//! A driving workbook points at a mock HTTP server; the tests check the info
//! file, the archived resources, and that reruns fetch nothing twice.

use std::path::Path;

use sheetbridge_core::download::DEFAULT_ARCHIVE_PREFIX;
use sheetbridge_core::{
    CellValue, HarvestRequest, HttpClient, Workbook, Worksheet, harvest,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a workbook with one row per `(filenum, flag column)` entry.
fn write_driving_workbook(path: &Path, base_url: &str, rows: &[(i64, u32)]) {
    let mut sheet = Worksheet::new("Records").expect("sheet");
    for (col, title) in (1..).zip(["nr", "filenum", "mrg", "meta", "wijk", "gron", "have"]) {
        sheet.set_value(1, col, title.into()).expect("header");
    }
    for (row, (filenum, flag_col)) in (2..).zip(rows) {
        sheet
            .set_value(row, 1, CellValue::Int(i64::from(row) - 1))
            .expect("nr");
        sheet
            .set_value(row, 2, CellValue::Int(*filenum))
            .expect("filenum");
        sheet
            .set_value(row, 3, format!("scan {filenum}").into())
            .expect("mrg name");
        sheet
            .set_hyperlink(row, 3, format!("{base_url}/mrg/{filenum}.psd"))
            .expect("mrg link");
        sheet
            .set_value(row, 4, "meta".into())
            .expect("meta name");
        sheet
            .set_hyperlink(row, 4, format!("{base_url}/meta/{filenum}.xml"))
            .expect("meta link");
        sheet
            .set_value(row, *flag_col, CellValue::Int(1))
            .expect("flag");
    }
    let mut book = Workbook::new();
    book.add_sheet(sheet).expect("add sheet");
    book.save(path).expect("save workbook");
}

async fn mount_resource(server: &MockServer, route: &str, body: &str, calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_harvest_archives_each_resource_once_across_runs() {
    let server = MockServer::start().await;
    mount_resource(&server, "/mrg/101.psd", "psd-101", 1).await;
    mount_resource(&server, "/meta/101.xml", "<meta id=\"101\"/>", 1).await;
    mount_resource(&server, "/mrg/102.psd", "psd-102", 1).await;
    mount_resource(&server, "/meta/102.xml", "<meta id=\"102\"/>", 1).await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let input = temp_dir.path().join("records.xlsx");
    write_driving_workbook(&input, &server.uri(), &[(101, 5), (102, 7)]);
    let request = HarvestRequest::new(&input, temp_dir.path().join("archive"));
    let client = HttpClient::new().expect("client");

    let first = harvest(&request, &client).await.expect("first run");
    assert_eq!(first.report.downloaded, 4);
    assert_eq!(first.report.failed(), 0);

    let second = harvest(&request, &client).await.expect("second run");
    assert_eq!(second.report.downloaded, 0);
    assert_eq!(second.report.skipped, 4);

    let archive = temp_dir.path().join("archive");
    let psd = archive.join(format!("{DEFAULT_ARCHIVE_PREFIX}_101.psd"));
    assert_eq!(std::fs::read_to_string(psd).expect("psd"), "psd-101");
    let meta = archive.join(format!("{DEFAULT_ARCHIVE_PREFIX}_102.meta.xml"));
    assert_eq!(
        std::fs::read_to_string(meta).expect("meta"),
        "<meta id=\"102\"/>"
    );
    // MockServer verifies the `.expect(1)` counts on drop.
}

#[tokio::test]
async fn test_harvest_writes_info_file_with_bom() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let input = temp_dir.path().join("records.xlsx");
    write_driving_workbook(&input, &server.uri(), &[(7, 6)]);
    let request = HarvestRequest::new(&input, temp_dir.path().join("archive"));
    let client = HttpClient::new().expect("client");

    let outcome = harvest(&request, &client).await.expect("harvest");

    let bytes = std::fs::read(&outcome.plan.info_path).expect("info file");
    let body = bytes
        .strip_prefix(b"\xEF\xBB\xBF")
        .expect("info file starts with a BOM");
    let records: serde_json::Value = serde_json::from_slice(body).expect("info json");
    let first = &records[0];
    assert_eq!(first["line"], 2);
    assert_eq!(first["filenum"], 7);
    assert_eq!(first["mrg_name"], "scan 7");
    assert_eq!(first["location"], "xDC108Groningen1");
    assert_eq!(
        first["meta_url"],
        format!("{}/meta/7.xml", server.uri()).as_str()
    );
}

#[tokio::test]
async fn test_harvest_failure_is_reported_and_batch_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mrg/1.psd"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_resource(&server, "/meta/1.xml", "<m/>", 1).await;
    mount_resource(&server, "/mrg/2.psd", "psd-2", 1).await;
    mount_resource(&server, "/meta/2.xml", "<m/>", 1).await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let input = temp_dir.path().join("records.xlsx");
    write_driving_workbook(&input, &server.uri(), &[(1, 5), (2, 5)]);
    let request = HarvestRequest::new(&input, temp_dir.path().join("archive"));
    let client = HttpClient::new().expect("client");

    let outcome = harvest(&request, &client).await.expect("harvest");

    assert_eq!(outcome.report.downloaded, 3);
    assert_eq!(outcome.report.failed(), 1);
    let failure = &outcome.report.failures[0];
    assert_eq!(failure.line, 2);
    assert!(
        failure.detail.contains("404"),
        "Expected status in: {}",
        failure.detail
    );
    let missing = temp_dir
        .path()
        .join("archive")
        .join(format!("{DEFAULT_ARCHIVE_PREFIX}_1.psd"));
    assert!(!missing.exists(), "failed resource must not leave a file");
}

#[tokio::test]
async fn test_harvest_prefix_controls_file_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let input = temp_dir.path().join("records.xlsx");
    write_driving_workbook(&input, &server.uri(), &[(9, 5)]);
    let mut request = HarvestRequest::new(&input, temp_dir.path().join("archive"));
    request.prefix = "scan".to_string();
    let client = HttpClient::new().expect("client");

    harvest(&request, &client).await.expect("harvest");

    let archive = temp_dir.path().join("archive");
    assert!(archive.join("scan_9.psd").is_file());
    assert!(archive.join("scan_9.meta.xml").is_file());
}
