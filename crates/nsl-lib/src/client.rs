//! Network access to the stage service.

use crate::error::StageError;
use crate::file::SelectedFile;
use crate::stage::StageId;
use log::debug;
use rand::Rng;
use serde_json::Value;

pub const FILE_FIELD: &str = "file";
pub const SERVER_ERROR_FALLBACK: &str = "Server error";

/// One call per analysis stage. Implementations never touch session state.
pub trait StageService: Send + Sync {
    fn run_stage(&self, stage: StageId, file: &SelectedFile) -> Result<Value, StageError>;
}

/// Blocking HTTP client posting the dataset as a single multipart field.
pub struct HttpStageClient {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpStageClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn endpoint_url(&self, stage: StageId) -> String {
        format!("{}{}", self.base_url, stage.endpoint())
    }
}

impl StageService for HttpStageClient {
    fn run_stage(&self, stage: StageId, file: &SelectedFile) -> Result<Value, StageError> {
        let contents = file.contents().map_err(|err| {
            StageError::Validation(format!("Cannot read {}: {err}", file.name()))
        })?;
        let form = MultipartForm::single_file(FILE_FIELD, file.name(), &contents);
        let url = self.endpoint_url(stage);
        debug!("POST {url} ({} bytes)", form.body.len());

        let response = match self
            .agent
            .post(&url)
            .set("Accept", "application/json")
            .set("Content-Type", &form.content_type())
            .send_bytes(&form.body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                debug!("{stage} answered HTTP {code}");
                return Err(StageError::Server(server_message(response)));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(StageError::Network(err.to_string()));
            }
        };

        serde_json::from_reader(response.into_reader())
            .map_err(|err| StageError::Server(format!("Invalid JSON response: {err}")))
    }
}

/// Message for a non-success response: the body's `error` string, else a fallback.
fn server_message(response: ureq::Response) -> String {
    serde_json::from_reader::<_, Value>(response.into_reader())
        .ok()
        .and_then(|body| error_field(&body))
        .unwrap_or_else(|| SERVER_ERROR_FALLBACK.to_string())
}

fn error_field(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(msg) if !msg.is_empty() => Some(msg.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    fn single_file(field: &str, filename: &str, contents: &[u8]) -> Self {
        let boundary = next_boundary();
        let filename = filename.replace('"', "%22").replace(['\r', '\n'], " ");
        let mut body = Vec::with_capacity(contents.len() + 256);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Self { boundary, body }
    }

    fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

fn next_boundary() -> String {
    let mut rng = rand::thread_rng();
    format!("----nsl-dash-{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    pub(crate) struct Captured {
        pub request_line: String,
        pub headers: Vec<String>,
        pub body: Vec<u8>,
    }

    /// Serve a single canned HTTP response and hand back the request it received.
    pub(crate) fn serve_once(status: &str, body: &str) -> (String, mpsc::Receiver<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut headers = Vec::new();
                let mut length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end().to_string();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            length = value.trim().parse().unwrap_or(0);
                        }
                    }
                    headers.push(line);
                }
                let mut body = vec![0u8; length];
                reader.read_exact(&mut body).unwrap();
                let mut stream = reader.into_inner();
                stream.write_all(response.as_bytes()).unwrap();
                let _ = tx.send(Captured {
                    request_line: request_line.trim_end().to_string(),
                    headers,
                    body,
                });
            }
        });
        (format!("http://{addr}"), rx)
    }

    fn arff() -> SelectedFile {
        SelectedFile::from_bytes("KDDTest.arff", b"@relation kdd\n@data\n".to_vec())
    }

    #[test]
    fn posts_file_field_to_stage_endpoint() {
        let (url, rx) = serve_once("200 OK", r#"{"accuracy":0.9,"train_samples":10}"#);
        let client = HttpStageClient::new(url);
        let value = client.run_stage(StageId::Training, &arff()).unwrap();
        assert_eq!(value["accuracy"], 0.9);
        assert_eq!(value["train_samples"], 10);

        let captured = rx.recv().unwrap();
        assert_eq!(captured.request_line, "POST /api/logistic/arff/ HTTP/1.1");
        assert!(captured
            .headers
            .iter()
            .any(|h| h.to_ascii_lowercase().starts_with("content-type: multipart/form-data; boundary=")));
        let body = String::from_utf8_lossy(&captured.body);
        assert!(body.contains("name=\"file\"; filename=\"KDDTest.arff\""));
        assert!(body.contains("@relation kdd\n@data\n"));
        assert_eq!(body.matches("Content-Disposition").count(), 1);
    }

    #[test]
    fn non_success_status_uses_error_field() {
        let (url, _rx) = serve_once("400 Bad Request", r#"{"error":"Archivo no enviado"}"#);
        let client = HttpStageClient::new(url);
        let err = client.run_stage(StageId::Split, &arff()).unwrap_err();
        assert_eq!(err, StageError::Server("Archivo no enviado".into()));
    }

    #[test]
    fn non_success_without_error_field_falls_back() {
        let (url, _rx) = serve_once("500 Internal Server Error", "<html>oops</html>");
        let client = HttpStageClient::new(url);
        let err = client.run_stage(StageId::Pipeline, &arff()).unwrap_err();
        assert_eq!(err, StageError::Server(SERVER_ERROR_FALLBACK.into()));
    }

    #[test]
    fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = HttpStageClient::new(format!("http://{addr}/"));
        let err = client.run_stage(StageId::Evaluation, &arff()).unwrap_err();
        assert!(matches!(err, StageError::Network(_)), "{err:?}");
    }

    #[test]
    fn unreadable_file_never_reaches_network() {
        let client = HttpStageClient::new("http://127.0.0.1:9");
        let missing = SelectedFile::from_path("/nonexistent/dir/x.arff");
        let err = client.run_stage(StageId::Training, &missing).unwrap_err();
        assert!(matches!(err, StageError::Validation(_)));
    }

    #[test]
    fn each_form_gets_its_own_boundary() {
        let first = MultipartForm::single_file(FILE_FIELD, "a.arff", b"@data");
        let second = MultipartForm::single_file(FILE_FIELD, "a.arff", b"@data");
        assert_ne!(first.boundary, second.boundary);
        assert_eq!(first.boundary.len(), "----nsl-dash-".len() + 32);
        let body = String::from_utf8_lossy(&first.body);
        assert!(body.ends_with(&format!("\r\n--{}--\r\n", first.boundary)));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let client = HttpStageClient::new("http://localhost:8000/");
        assert_eq!(
            client.endpoint_url(StageId::Evaluation),
            "http://localhost:8000/api/notebook10/evaluation/"
        );
    }
}
