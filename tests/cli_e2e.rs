use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn route(target: &str) -> Option<&'static str> {
    match target {
        "/search/search.fcgi?search=Lamine+Yamal" => Some("search_yamal.html"),
        "/search/search.fcgi?search=Nobody+Atall" => Some("search_empty.html"),
        "/search/search.fcgi?search=Zlatan" => Some("search_yamal.html"),
        "/en/players/82ec26c1/Lamine-Yamal" => Some("profile_yamal.html"),
        "/en/players/82ec26c1/dom_lg/Lamine-Yamal-Domestic-League-Stats" => {
            Some("stats_dom_lg_yamal.html")
        }
        _ => None,
    }
}

fn serve(mut stream: TcpStream) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => break,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {}
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = match route(target) {
        Some(name) => (
            "200 OK",
            fs::read_to_string(fixture_path(name)).expect("fixture"),
        ),
        None => ("404 Not Found", "not found".to_string()),
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Fixture-backed stand-in for the site, bound to an ephemeral port.
fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || serve(stream));
        }
    });
    format!("http://{addr}")
}

fn scout(base_url: &str, work: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scout"))
        .args(args)
        .current_dir(work)
        .env("FBREF_BASE_URL", base_url)
        .env("FBREF_RATE_SECS", "0")
        .env("FBREF_BACKOFF_BASE_MS", "0")
        .env("FBREF_MAX_RETRIES", "1")
        .env("FBREF_FALLBACK", "off")
        .env("FBREF_DATA_DIR", work.join("data"))
        .env("FBREF_PASSPORT_DIR", work.join("passport"))
        .env("FBREF_CHART_DIR", work.join("compare"))
        .env_remove("RUST_LOG")
        .output()
        .expect("scout binary runs")
}

#[test]
fn found_player_exits_zero_with_a_passport() {
    let base = start_server();
    let work = tempfile::tempdir().expect("tempdir");
    let output = scout(&base, work.path(), &["Lamine", "Yamal"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "stdout: {stdout}");
    assert!(stdout.contains("Found Lamine Yamal"));

    let passport = work.path().join("passport").join("passport_Lamine_Yamal.html");
    let html = fs::read_to_string(&passport).expect("passport written");
    assert!(!html.is_empty());
    assert!(html.contains("Barcelona"));
}

#[test]
fn stats_flags_export_a_csv() {
    let base = start_server();
    let work = tempfile::tempdir().expect("tempdir");
    let output = scout(
        &base,
        work.path(),
        &[
            "Lamine Yamal",
            "--competition",
            "dl",
            "--season",
            "2023-2024",
            "--stat-type",
            "standard",
            "--data-dir",
            work.path().join("csv").to_str().expect("utf8 path"),
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "stdout: {stdout}");
    let csv = work
        .path()
        .join("csv")
        .join("Lamine_Yamal_dl_2023-2024_standard.csv");
    let text = fs::read_to_string(csv).expect("csv written");
    assert!(text.starts_with("Season,Category,Stat,Value"));
}

#[test]
fn zero_players_and_rejected_queries_exit_differently() {
    let base = start_server();
    let work = tempfile::tempdir().expect("tempdir");

    let none = scout(&base, work.path(), &["Nobody", "Atall"]);
    assert_eq!(none.status.code(), Some(3));

    let rejected = scout(&base, work.path(), &["Zlatan"]);
    assert_eq!(rejected.status.code(), Some(2));

    assert!(!work.path().join("passport").exists());
}

#[test]
fn missing_season_is_an_extraction_failure() {
    let base = start_server();
    let work = tempfile::tempdir().expect("tempdir");
    let output = scout(
        &base,
        work.path(),
        &[
            "Lamine Yamal",
            "--competition",
            "dl",
            "--season",
            "2019-2020",
            "--stat-type",
            "standard",
        ],
    );
    assert_eq!(output.status.code(), Some(5));
    assert!(String::from_utf8_lossy(&output.stdout).contains("no data for season 2019-2020"));
}

#[test]
fn missing_stats_page_is_a_download_failure() {
    let base = start_server();
    let work = tempfile::tempdir().expect("tempdir");
    let output = scout(
        &base,
        work.path(),
        &[
            "Lamine Yamal",
            "--competition",
            "nt",
            "--season",
            "all",
            "--stat-type",
            "standard",
        ],
    );
    assert_eq!(output.status.code(), Some(4));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Found Lamine Yamal"), "stdout: {stdout}");
    assert!(stdout.contains("Passport written to"));
    let passport = work.path().join("passport").join("passport_Lamine_Yamal.html");
    assert!(passport.exists());
}

#[test]
fn partial_flags_exit_before_any_request() {
    let work = tempfile::tempdir().expect("tempdir");
    let output = scout("http://127.0.0.1:9", work.path(), &["Pedri", "--season", "2023-2024"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn compare_with_writes_a_chart() {
    let base = start_server();
    let work = tempfile::tempdir().expect("tempdir");
    let output = scout(
        &base,
        work.path(),
        &[
            "Lamine Yamal",
            "--competition",
            "dl",
            "--season",
            "2023-2024",
            "--stat-type",
            "standard",
            "--compare-with",
            "Lamine Yamal",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "stdout: {stdout}");
    assert!(stdout.contains("Goals"));
    let charts = fs::read_dir(work.path().join("compare"))
        .expect("chart dir")
        .flatten()
        .collect::<Vec<_>>();
    assert_eq!(charts.len(), 1);
    let svg = fs::read_to_string(charts[0].path()).expect("svg");
    assert!(svg.starts_with("<svg"));
}
