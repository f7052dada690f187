use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{json, Value};
use std::error::Error;
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

/// Minimal stage service: answers each POST by path and records the paths it saw.
struct FakeService {
    base_url: String,
    paths: Arc<Mutex<Vec<String>>>,
}

impl FakeService {
    fn start(route: fn(&str) -> (u16, Value)) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let paths = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&paths);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                answer(stream, route, &seen);
            }
        });
        Self { base_url, paths }
    }

    fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

fn answer(stream: TcpStream, route: fn(&str) -> (u16, Value), seen: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let mut length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                length = value.trim().parse().unwrap();
            }
        }
    }
    let mut body = vec![0; length];
    reader.read_exact(&mut body).unwrap();

    let (status, payload) = route(&path);
    seen.lock().unwrap().push(path);
    let text = payload.to_string();
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{text}",
        text.len()
    )
    .unwrap();
}

fn route(path: &str) -> (u16, Value) {
    match path {
        "/api/logistic/arff/" => (
            200,
            json!({"accuracy": 0.97, "train_samples": 80, "test_samples": 20, "features_after_encoding": 122}),
        ),
        "/api/correlation/arff/" => (
            200,
            json!({
                "correlation": {"columns": ["a", "b"], "matrix": [[1.0, 0.25], [0.25, 1.0]]},
                "scatter": {"same_srv_rate": [0.5, 1.0], "dst_host_srv_count": [10, 255]}
            }),
        ),
        "/api/split/arff/" => (400, json!({"error": "bad file"})),
        "/api/notebook10/evaluation/" => (
            200,
            json!({
                "metrics": {"accuracy": 0.95, "precision": 0.94, "recall": 0.96, "f1": 0.95},
                "confusion_matrix": {"tn": 50, "fp": 3, "fn": 2, "tp": 45}
            }),
        ),
        _ => (404, json!({})),
    }
}

fn arff_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, "@relation kdd\n@data\n").unwrap();
    path
}

#[test]
fn wrong_extension_never_reaches_the_service() -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    listener.set_nonblocking(true)?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let dir = tempfile::tempdir()?;
    let csv = arff_file(&dir, "KDDTrain+.csv");

    let output = cargo_bin_cmd!("nsl-dash")
        .args(["--base-url", &base_url, "run-all", "--file"])
        .arg(&csv)
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Please select a .arff file"), "{stderr}");
    match listener.accept() {
        Err(err) => assert_eq!(err.kind(), ErrorKind::WouldBlock),
        Ok(_) => panic!("a request reached the service"),
    }
    Ok(())
}

#[test]
fn single_stage_prints_result_verbatim() -> Result<(), Box<dyn Error>> {
    let service = FakeService::start(route);
    let dir = tempfile::tempdir()?;
    let file = arff_file(&dir, "KDDTest+.arff");

    let output = cargo_bin_cmd!("nsl-dash")
        .args(["--base-url", &service.base_url, "run", "evaluation", "--file"])
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let printed: Value = serde_json::from_slice(&output)?;
    assert_eq!(printed["evaluation"], route("/api/notebook10/evaluation/").1);
    assert_eq!(service.paths(), ["/api/notebook10/evaluation/"]);
    Ok(())
}

#[test]
fn chain_stops_at_failed_split() -> Result<(), Box<dyn Error>> {
    let service = FakeService::start(route);
    let dir = tempfile::tempdir()?;
    let file = arff_file(&dir, "KDDTrain+.arff");

    let output = cargo_bin_cmd!("nsl-dash")
        .args(["--base-url", &service.base_url, "run-all", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .get_output()
        .clone();
    let printed: Value = serde_json::from_slice(&output.stdout)?;
    let keys: Vec<&str> = printed.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["training", "correlation"]);
    assert!(String::from_utf8(output.stderr)?.contains("bad file"));
    assert_eq!(
        service.paths(),
        ["/api/logistic/arff/", "/api/correlation/arff/", "/api/split/arff/"]
    );
    Ok(())
}

#[test]
fn tables_render_saved_results_offline() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let saved = dir.path().join("evaluation.json");
    fs::write(&saved, route("/api/notebook10/evaluation/").1.to_string())?;

    let output = cargo_bin_cmd!("nsl-dash")
        .args(["tables", "evaluation", "--format", "csv", "--input"])
        .arg(&saved)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    assert!(text.contains("Actual Normal,50,3"), "{text}");
    assert!(text.contains("Actual Attack,2,45"), "{text}");
    Ok(())
}

#[test]
fn scatter_limit_flag_bounds_the_table() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let saved = dir.path().join("correlation.json");
    fs::write(&saved, route("/api/correlation/arff/").1.to_string())?;

    let output = cargo_bin_cmd!("nsl-dash")
        .args(["--scatter-limit", "1", "tables", "correlation", "--format", "csv", "--input"])
        .arg(&saved)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    assert!(text.contains("0.500,10"), "{text}");
    assert!(!text.contains("1.000,255"), "{text}");
    Ok(())
}
