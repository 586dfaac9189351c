use std::thread;
use std::time::Duration;

use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

use crate::config::PineconeConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::providers::{IndexRecord, ScoredChunk, VectorIndex};

#[derive(Serialize)]
struct CreateIndex<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
}

#[derive(Deserialize)]
struct DescribeResponse {
    status: Option<IndexStatus>,
}

#[derive(Deserialize, Debug, PartialEq)]
pub(crate) struct IndexStatus {
    #[serde(default)]
    pub(crate) ready: bool,
    pub(crate) host: Option<String>,
}

#[derive(Serialize)]
struct UpsertVectors<'a> {
    vectors: &'a [IndexRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

/// Handle on one Pinecone index in a legacy, environment-scoped project.
pub struct PineconeIndex {
    pub(crate) http: ApiClient,
    controller_url: String,
    pub(crate) name: String,
    metric: String,
    pub(crate) host: Option<String>,
    data_scheme: &'static str,
    ready_polls: usize,
    poll_interval: Duration,
}

impl PineconeIndex {
    pub fn new(cfg: &PineconeConfig, metric: &str) -> Result<Self> {
        Self::with_endpoints(
            cfg,
            metric,
            format!("https://controller.{}.pinecone.io", cfg.environment),
            "https",
            Duration::from_secs(2),
        )
    }

    /// Points the handle at another controller, reaching data-plane hosts over `data_scheme`.
    pub(crate) fn with_endpoints(
        cfg: &PineconeConfig,
        metric: &str,
        controller_url: String,
        data_scheme: &'static str,
        poll_interval: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: ApiClient::new("pinecone", HeaderName::from_static("api-key"), &cfg.api_key)?,
            controller_url,
            name: cfg.index_name.clone(),
            metric: metric.to_string(),
            host: None,
            data_scheme,
            ready_polls: 60,
            poll_interval,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks the index up. `None` if it does not exist.
    pub(crate) fn describe(&self) -> Result<Option<IndexStatus>> {
        let url = format!("{}/databases/{}", self.controller_url, self.name);
        match self.http.get_json::<DescribeResponse>(&url) {
            Ok(res) => Ok(Some(res.status.unwrap_or(IndexStatus {
                ready: false,
                host: None,
            }))),
            Err(Error::Service { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn data_url(&self, host: &str, path: &str) -> String {
        format!("{}://{}{}", self.data_scheme, host, path)
    }

    /// Resolves the data-plane host of an index that must already exist.
    pub(crate) fn existing_host(&mut self) -> Result<String> {
        if let Some(host) = &self.host {
            return Ok(host.clone());
        }
        let status = self
            .describe()?
            .ok_or_else(|| Error::IndexNotFound(self.name.clone()))?;
        let host = status
            .host
            .ok_or_else(|| Error::IndexNotReady(self.name.clone()))?;
        self.host = Some(host.clone());
        Ok(host)
    }

    /// Resolves the data-plane host, creating the index with `dimension` if needed.
    fn ensure_index(&mut self, dimension: usize) -> Result<String> {
        if let Some(host) = &self.host {
            return Ok(host.clone());
        }
        match self.describe()? {
            Some(IndexStatus {
                ready: true,
                host: Some(host),
            }) => {
                self.host = Some(host.clone());
                return Ok(host);
            }
            Some(_) => {}
            None => {
                tracing::info!(index = %self.name, dimension, "creating Pinecone index");
                let body = CreateIndex {
                    name: &self.name,
                    dimension,
                    metric: &self.metric,
                };
                let url = format!("{}/databases", self.controller_url);
                let created = self.http.post_text(&url, &body)?;
                tracing::debug!(index = %self.name, response = %created, "create requested");
            }
        }
        let host = self.wait_until_ready()?;
        self.host = Some(host.clone());
        Ok(host)
    }

    fn wait_until_ready(&self) -> Result<String> {
        for _ in 0..self.ready_polls {
            if let Some(IndexStatus {
                ready: true,
                host: Some(host),
            }) = self.describe()?
            {
                return Ok(host);
            }
            thread::sleep(self.poll_interval);
        }
        Err(Error::IndexNotReady(self.name.clone()))
    }

    fn store_vectors(&mut self, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let host = self.ensure_index(records[0].values.len())?;
        let url = self.data_url(&host, "/vectors/upsert");
        let body = UpsertVectors { vectors: records };
        let res = self.http.post_json::<UpsertResponse, _>(&url, &body)?;
        tracing::debug!(index = %self.name, upserted = res.upserted_count, "upserted vectors");
        Ok(())
    }
}

impl VectorIndex for PineconeIndex {
    fn upsert(&mut self, records: &[IndexRecord]) -> Result<()> {
        self.store_vectors(records)
    }

    fn similarity_search(&mut self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        self.query(vector, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug)]
    struct Request {
        method: String,
        path: String,
        body: String,
    }

    /// Local HTTP server answering from a closure and recording every request.
    struct StubServer {
        addr: String,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl StubServer {
        fn start<F>(respond: F) -> Self
        where
            F: Fn(&Request, &str) -> (u16, String) + Send + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap().to_string();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);
            let host = addr.clone();
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let mut stream = stream.unwrap();
                    let request = read_request(&mut stream);
                    let (status, body) = respond(&request, &host);
                    seen.lock().unwrap().push(request);
                    let reply = format!(
                        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    stream.write_all(reply.as_bytes()).unwrap();
                }
            });
            Self { addr, requests }
        }

        fn calls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| format!("{} {}", r.method, r.path))
                .collect()
        }

        fn body(&self, n: usize) -> Value {
            serde_json::from_str(&self.requests.lock().unwrap()[n].body).unwrap()
        }
    }

    fn read_request(stream: &mut TcpStream) -> Request {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let mut parts = line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).unwrap();
        Request {
            method,
            path,
            body: String::from_utf8(body).unwrap(),
        }
    }

    fn stub_index(server: &StubServer) -> PineconeIndex {
        let cfg = PineconeConfig {
            api_key: "pc-key".to_string(),
            index_name: "climate".to_string(),
            environment: "local".to_string(),
        };
        PineconeIndex::with_endpoints(
            &cfg,
            "cosine",
            format!("http://{}", server.addr),
            "http",
            Duration::from_millis(5),
        )
        .unwrap()
    }

    #[test]
    fn upsert_creates_missing_index_and_waits_until_ready() {
        let describes = AtomicUsize::new(0);
        let server = StubServer::start(move |req, host| {
            match (req.method.as_str(), req.path.as_str()) {
                ("GET", "/databases/climate") => match describes.fetch_add(1, Ordering::SeqCst) {
                    0 => (404, r#"{"error":"not found"}"#.to_string()),
                    1 => (200, r#"{"status":{"ready":false}}"#.to_string()),
                    _ => (200, json!({"status": {"ready": true, "host": host}}).to_string()),
                },
                ("POST", "/databases") => (201, String::new()),
                ("POST", "/vectors/upsert") => (200, r#"{"upsertedCount":1}"#.to_string()),
                _ => (500, String::new()),
            }
        });
        let mut index = stub_index(&server);
        let records = vec![IndexRecord {
            id: "a".to_string(),
            values: vec![0.25, 0.5],
            metadata: json!({"text": "ice", "source": "r.pdf", "page": 0}),
        }];

        index.upsert(&records).unwrap();
        index.upsert(&records).unwrap();

        assert_eq!(
            server.calls(),
            vec![
                "GET /databases/climate",
                "POST /databases",
                "GET /databases/climate",
                "GET /databases/climate",
                "POST /vectors/upsert",
                "POST /vectors/upsert",
            ]
        );
        assert_eq!(
            server.body(1),
            json!({"name": "climate", "dimension": 2, "metric": "cosine"})
        );
        assert_eq!(server.body(4)["vectors"][0]["id"], "a");
    }

    #[test]
    fn search_on_missing_index_is_not_found() {
        let server = StubServer::start(|_, _| (404, r#"{"error":"not found"}"#.to_string()));
        let mut index = stub_index(&server);

        let err = index.similarity_search(&[0.1, 0.2], 4).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound(ref name) if name == "climate"), "{err}");
        let err = index.similarity_search(&[], 4).unwrap_err();
        assert!(matches!(err, Error::IndexNotFound(_)), "{err}");

        let calls = server.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c == "GET /databases/climate"));
    }

    #[test]
    fn host_is_resolved_once_per_handle() {
        let server = StubServer::start(|req, host| match req.path.as_str() {
            "/databases/climate" => (200, json!({"status": {"ready": true, "host": host}}).to_string()),
            "/query" => (
                200,
                json!({"matches": [{"id": "1", "score": 0.9,
                    "metadata": {"text": "Glaciers retreat.", "source": "ar6.pdf", "page": 2}}]})
                .to_string(),
            ),
            _ => (500, String::new()),
        });
        let mut index = stub_index(&server);

        let first = index.similarity_search(&[0.1], 4).unwrap();
        let second = index.similarity_search(&[0.1], 4).unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].text, "Glaciers retreat.");
        assert_eq!(first[0].page, Some(2));
        assert_eq!(
            server.calls(),
            vec!["GET /databases/climate", "POST /query", "POST /query"]
        );
        assert_eq!(server.body(1)["topK"], 4);
        assert_eq!(server.body(1)["includeMetadata"], true);
    }

    #[test]
    fn upsert_body_matches_pinecone_shape() {
        let records = vec![IndexRecord {
            id: "a".to_string(),
            values: vec![0.25, 0.5],
            metadata: json!({"text": "ice", "source": "r.pdf", "page": 0}),
        }];
        let body = serde_json::to_value(UpsertVectors { vectors: &records }).unwrap();
        assert_eq!(
            body,
            json!({"vectors": [{
                "id": "a",
                "values": [0.25, 0.5],
                "metadata": {"text": "ice", "source": "r.pdf", "page": 0}
            }]})
        );
    }

    #[test]
    fn describe_response_exposes_host() {
        let raw = r#"{"database":{"name":"climate","dimension":1536,"metric":"cosine"},
            "status":{"ready":true,"host":"climate-abc.svc.us-west1-gcp.pinecone.io","state":"Ready"}}"#;
        let res: DescribeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            res.status,
            Some(IndexStatus {
                ready: true,
                host: Some("climate-abc.svc.us-west1-gcp.pinecone.io".to_string()),
            })
        );
    }
}
