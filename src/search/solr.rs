//! Solr HTTP client / Solr HTTP 客户端
//!
//! Endpoints used / 使用的接口：
//! - POST {core}/update/extract  content extraction + indexing / 内容抽取与索引
//! - POST {core}/update?commit=true / 提交
//! - GET  {core}/terms  term enumeration / 词项枚举
//! - GET  {core}/select  field queries and highlighting / 查询与高亮
//! - GET  {core}/admin/ping  core availability / 核心可用性

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::io::ReaderStream;

use super::schema::IndexDocument;
use super::{ContentStream, IndexServiceClient, SnippetRequest, Term, TermsRequest};
use crate::config::{QueryConfig, ServerConfig};
use crate::error::IndexError;

/// Poll interval while waiting for the core to come back / 等待核心恢复的轮询间隔
const OPEN_CORE_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectDocs,
    #[serde(default)]
    highlighting: HashMap<String, HashMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct SelectDocs {
    #[serde(default)]
    docs: Vec<HashMap<String, Value>>,
}

pub struct SolrClient {
    server: ServerConfig,
    query: QueryConfig,
    client: Client,
    core_open: AtomicBool,
}

impl SolrClient {
    pub fn new(server: ServerConfig, query: QueryConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .build()
            .map_err(|e| IndexError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            server,
            query,
            client,
            core_open: AtomicBool::new(false),
        })
    }

    /// Create the client and open the core / 创建客户端并打开核心
    pub async fn connect(server: ServerConfig, query: QueryConfig) -> Result<Self, IndexError> {
        let solr = Self::new(server, query)?;
        solr.open_core().await?;
        tracing::info!("Connected to index core {}", solr.server.core_url());
        Ok(solr)
    }

    fn core_url(&self, path: &str) -> Result<String, IndexError> {
        if !self.core_open.load(Ordering::SeqCst) {
            return Err(IndexError::NoOpenCore(format!("Core {} is not open", self.server.core)));
        }
        Ok(format!("{}{}", self.server.core_url(), path))
    }

    async fn check(response: Response) -> Result<Response, IndexError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND | StatusCode::SERVICE_UNAVAILABLE => {
                Err(IndexError::NoOpenCore(format!("Index core unavailable ({})", status)))
            }
            _ => Err(IndexError::Request(format!("Index returned {}: {}", status, body))),
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)], timeout: Duration) -> Result<Value, IndexError> {
        let url = self.core_url(path)?;
        let response = self
            .client
            .get(&url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport)?;
        Self::check(response)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| IndexError::Request(format!("Invalid response from {}: {}", url, e)))
    }

    async fn run_command(&self, command: Option<&str>, what: &str) -> Result<(), IndexError> {
        let Some(command) = command else {
            tracing::debug!("No {} command configured for the index service", what);
            return Ok(());
        };

        tracing::info!("Running index service {} command: {}", what, command);
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .await
            .map_err(|e| IndexError::Request(format!("Failed to run {} command: {}", what, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(IndexError::Request(format!("{} command exited with {}", what, status)))
        }
    }

    async fn ping(&self) -> bool {
        let url = format!("{}/admin/ping", self.server.core_url());
        match self
            .client
            .get(&url)
            .query(&[("wt", "json")])
            .timeout(OPEN_CORE_POLL * 4)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

fn map_transport(err: reqwest::Error) -> IndexError {
    if err.is_connect() {
        IndexError::NoOpenCore(format!("Cannot reach index service: {}", err))
    } else {
        IndexError::Request(err.to_string())
    }
}

/// Parse a `/terms` response in flat list form: [term, freq, term, freq, ...] / 解析词项响应
fn parse_terms(body: &Value, field: &str) -> Vec<Term> {
    let Some(list) = body.get("terms").and_then(|t| t.get(field)).and_then(|l| l.as_array()) else {
        return Vec::new();
    };
    list.chunks(2)
        .filter_map(|pair| {
            let term = pair.first()?.as_str()?.to_string();
            let frequency = pair.get(1).and_then(|f| f.as_u64()).unwrap_or(0);
            Some(Term { term, frequency })
        })
        .collect()
}

fn parse_doc_id(doc: &HashMap<String, Value>) -> Option<i64> {
    match doc.get("id")? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[async_trait]
impl IndexServiceClient for SolrClient {
    async fn submit(&self, document: IndexDocument, stream: ContentStream) -> Result<(), IndexError> {
        let url = self.core_url("/update/extract")?;

        let mut params: Vec<(String, String)> = document
            .fields()
            .into_iter()
            .map(|(name, value)| (format!("literal.{}", name), value))
            .collect();
        params.push(("resource.name".to_string(), document.file_name.clone()));
        params.push(("commit".to_string(), "false".to_string()));

        let body = reqwest::Body::wrap_stream(ReaderStream::new(stream));
        let response = self
            .client
            .post(&url)
            .query(&params)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(map_transport)?;

        // Extraction problems come back as server errors, the service is still fine / 抽取失败返回 500，服务本身正常
        if response.status() == StatusCode::INTERNAL_SERVER_ERROR {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Content(format!(
                "Problem posting file contents, server error: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), IndexError> {
        let url = self.core_url("/update")?;
        let response = self
            .client
            .post(&url)
            .query(&[("commit", "true"), ("wt", "json")])
            .timeout(self.server.request_timeout())
            .send()
            .await
            .map_err(map_transport)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn enumerate_terms(&self, request: &TermsRequest) -> Result<Vec<Term>, IndexError> {
        let mut params = vec![
            ("terms", "true".to_string()),
            ("terms.fl", request.field.clone()),
            ("terms.regex", request.regex.clone()),
            ("terms.limit", request.limit.map(|l| l.to_string()).unwrap_or_else(|| "-1".to_string())),
            ("timeAllowed", request.time_allowed.as_millis().to_string()),
            ("wt", "json".to_string()),
        ];
        if request.case_insensitive {
            params.push(("terms.regex.flag", "case_insensitive".to_string()));
        }

        // Leave the service room to answer after its own allowance / 给服务端留出超出时限后的响应时间
        let timeout = request.time_allowed + self.server.request_timeout();
        let body = self.get_json("/terms", &params, timeout).await?;
        Ok(parse_terms(&body, &request.field))
    }

    async fn query(&self, query: &str, rows: usize) -> Result<Vec<i64>, IndexError> {
        let params = [
            ("q", query.to_string()),
            ("fl", "id".to_string()),
            ("rows", rows.to_string()),
            ("wt", "json".to_string()),
        ];
        let body = self.get_json("/select", &params, self.server.request_timeout()).await?;
        let response: SelectResponse = serde_json::from_value(body)
            .map_err(|e| IndexError::Request(format!("Invalid select response: {}", e)))?;
        Ok(response.response.docs.iter().filter_map(parse_doc_id).collect())
    }

    async fn snippet(&self, request: &SnippetRequest) -> Result<String, IndexError> {
        let field = request.highlight_field(&self.query.terms_field).to_string();
        let snippets = if request.verify_only { 1 } else { 3 };
        let params = [
            ("q", request.highlight_query(&self.query.terms_field)),
            ("fq", format!("id:{}", request.content_id)),
            ("fl", "id".to_string()),
            ("rows", "1".to_string()),
            ("hl", "true".to_string()),
            ("hl.fl", field.clone()),
            ("hl.snippets", snippets.to_string()),
            ("hl.fragsize", self.query.snippet_fragment_size.to_string()),
            ("hl.simple.pre", self.query.highlight_pre.clone()),
            ("hl.simple.post", self.query.highlight_post.clone()),
            ("wt", "json".to_string()),
        ];
        let body = self.get_json("/select", &params, self.server.request_timeout()).await?;
        let response: SelectResponse = serde_json::from_value(body)
            .map_err(|e| IndexError::Request(format!("Invalid highlight response: {}", e)))?;

        let snippet = response
            .highlighting
            .get(&request.content_id.to_string())
            .and_then(|fields| fields.get(&field))
            .map(|fragments| fragments.join(" ... "))
            .unwrap_or_default();
        Ok(snippet)
    }

    async fn close_core(&self) -> Result<(), IndexError> {
        self.core_open.store(false, Ordering::SeqCst);
        tracing::info!("Index core {} closed", self.server.core);
        Ok(())
    }

    async fn stop(&self) -> Result<(), IndexError> {
        self.run_command(self.server.stop_command.as_deref(), "stop").await
    }

    async fn start(&self) -> Result<(), IndexError> {
        self.run_command(self.server.start_command.as_deref(), "start").await
    }

    async fn open_core(&self) -> Result<(), IndexError> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(self.server.startup_wait_secs);
        loop {
            if self.ping().await {
                self.core_open.store(true, Ordering::SeqCst);
                tracing::info!("Index core {} open", self.server.core);
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(IndexError::NoOpenCore(format!(
                    "Core {} did not respond within {}s",
                    self.server.core, self.server.startup_wait_secs
                )));
            }
            tokio::time::sleep(OPEN_CORE_POLL).await;
        }
    }
}
