// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};
use umdops_app::pages::{self, ACQUISITIONS_TABLE};
use umdops_app::{ImageFetchError, SourceError, TabularSource};
use umdops_remote::{PhotoClient, SheetRange, SheetsClient};

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

fn tables() -> BTreeMap<String, SheetRange> {
    BTreeMap::from([(
        ACQUISITIONS_TABLE.to_owned(),
        SheetRange {
            spreadsheet_id: "sheet123".to_owned(),
            range: "Issues".to_owned(),
        },
    )])
}

#[test]
fn sheets_client_reads_grid_through_values_api() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(
            request.url(),
            "/v4/spreadsheets/sheet123/values/Issues?key=secret"
        );
        let body = r#"{
            "range": "Issues!A1:M3",
            "majorDimension": "ROWS",
            "values": [
                ["Position", "", "Modules", "Date", "", "", "Summary", "", "", "Team", "", "Status", "Report"],
                ["Kathy", "", "M101", "05/03/2024", "", "", "No data", "", "", "Malargüe", "", "Open", "Cable cut"],
                ["Coihueco", "", "M102", "06/03/2024", "", "", "Noisy", "", "", "Bariloche", "", "Complete", 42]
            ]
        }"#;
        let response = Response::from_string(body)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let mut client = SheetsClient::new(&addr, "secret", tables(), Duration::from_secs(1))?;
    let table = pages::acquisitions().load(&mut client)?;
    assert_eq!(table.len(), 2);
    assert_eq!(table.text(&table.records[0], "position"), "Kathy");
    assert_eq!(table.text(&table.records[0], "date"), "2024-03-05");
    assert_eq!(table.text(&table.records[1], "report"), "42");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn sheets_client_maps_http_errors_to_source_unavailable() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(
            r#"{"error":{"code":403,"message":"API key not valid"}}"#,
        )
        .with_status_code(403)
        .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let mut client = SheetsClient::new(&addr, "bad", tables(), Duration::from_secs(1))?;
    let error = client
        .read(ACQUISITIONS_TABLE)
        .expect_err("403 should fail");
    match error {
        SourceError::SourceUnavailable { table, reason } => {
            assert_eq!(table, ACQUISITIONS_TABLE);
            assert!(reason.contains("API key not valid"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn sheets_client_reports_unconfigured_table() -> Result<()> {
    let mut client = SheetsClient::new(
        "http://127.0.0.1:1",
        "key",
        BTreeMap::new(),
        Duration::from_millis(50),
    )?;
    let error = client.read("field_work").expect_err("no range configured");
    assert!(error.to_string().contains("[source.tables.field_work]"));
    Ok(())
}

#[test]
fn sheets_client_unreachable_endpoint_is_unavailable() -> Result<()> {
    let mut client = SheetsClient::new("http://127.0.0.1:1", "key", tables(), Duration::from_millis(50))?;
    let error = client.read(ACQUISITIONS_TABLE).expect_err("nothing listens");
    assert!(error.to_string().contains("cannot reach"), "{error}");
    Ok(())
}

#[test]
fn photo_client_fetches_and_caches_image_bytes() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/uc?export=view&id=abc123");
        let response = Response::from_data(vec![0xFF, 0xD8, 0xFF]).with_status_code(200);
        request.respond(response).expect("response should succeed");
    });

    let cache = tempfile::tempdir()?;
    let client = PhotoClient::new(&addr, Duration::from_secs(1))?;
    let link = "https://drive.google.com/open?id=abc123";
    let path = client
        .fetch_cached(link, cache.path())
        .map_err(|error| anyhow!("{error}"))?;
    assert_eq!(std::fs::read(&path)?, vec![0xFF, 0xD8, 0xFF]);

    handle.join().expect("server thread should join");

    let again = client
        .fetch_cached(link, cache.path())
        .map_err(|error| anyhow!("{error}"))?;
    assert_eq!(again, path);
    Ok(())
}

#[test]
fn photo_client_cache_holds_only_finished_images() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        for status in [200, 404] {
            let request = server.recv().expect("request expected");
            let response = Response::from_data(vec![0x89, 0x50]).with_status_code(status);
            request.respond(response).expect("response should succeed");
        }
    });

    let cache = tempfile::tempdir()?;
    let client = PhotoClient::new(&addr, Duration::from_secs(1))?;
    let path = client
        .fetch_cached("https://drive.google.com/open?id=kept", cache.path())
        .map_err(|error| anyhow!("{error}"))?;
    assert_eq!(
        client.fetch_cached("https://drive.google.com/open?id=gone", cache.path()),
        Err(ImageFetchError::NotFound)
    );
    handle.join().expect("server thread should join");

    let entries = std::fs::read_dir(cache.path())?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    assert_eq!(entries, vec![path]);
    Ok(())
}

#[test]
fn photo_client_write_failure_is_fetch_error() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_data(vec![0xFF, 0xD8]).with_status_code(200);
        request.respond(response).expect("response should succeed");
    });

    let cache = tempfile::tempdir()?;
    let missing = cache.path().join("missing");
    let client = PhotoClient::new(&addr, Duration::from_secs(1))?;
    let result = client.fetch_cached("https://drive.google.com/open?id=lost", &missing);
    handle.join().expect("server thread should join");

    assert!(
        matches!(&result, Err(ImageFetchError::FetchError(message)) if message.starts_with("write ")),
        "{result:?}"
    );
    assert!(!missing.exists());
    Ok(())
}

#[test]
fn photo_client_maps_404_to_not_found() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        for status in [404, 500] {
            let request = server.recv().expect("request expected");
            let response = Response::from_string("nope").with_status_code(status);
            request.respond(response).expect("response should succeed");
        }
    });

    let client = PhotoClient::new(&addr, Duration::from_secs(1))?;
    let link = "https://drive.google.com/open?id=gone";
    assert_eq!(client.fetch_image(link), Err(ImageFetchError::NotFound));
    assert_eq!(
        client.fetch_image(link),
        Err(ImageFetchError::FetchError("HTTP 500".to_owned()))
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn photo_client_rejects_link_without_id() -> Result<()> {
    let client = PhotoClient::new("https://drive.google.com", Duration::from_millis(50))?;
    assert!(matches!(
        client.fetch_image("https://example.com/photo.jpg"),
        Err(ImageFetchError::FetchError(_))
    ));
    Ok(())
}
