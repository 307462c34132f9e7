//! Index service module - only provides index capabilities (primitives), does not control flow / 索引服务模块
//!
//! Architecture principles / 架构原则：
//! - The index client only exposes primitive operations: submit, commit, terms, query, snippet / 只暴露原语操作
//! - Ingest and query modules control timeouts, recovery and error isolation / 超时、恢复与错误隔离由调用方控制
//! - Call direction: ingest/query → search (unidirectional) / 调用方向
//!
//! Backends / 实现：
//! - `MemoryIndex`: in-process inverted index / 进程内倒排索引
//! - `SolrClient`: HTTP client for a Solr core / Solr HTTP 客户端

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::AsyncRead;

use crate::error::IndexError;

pub mod engine;
pub mod schema;
pub mod solr;
pub mod tokenizer;

pub use engine::{IndexStats, MemoryIndex};
pub use schema::IndexDocument;
pub use solr::SolrClient;

/// Default field, analyzed with the standard tokenizer / 默认字段（标准分词）
pub const CONTENT_FIELD: &str = "content";

/// Content stream submitted with a document / 随文档提交的内容流
pub type ContentStream = Box<dyn AsyncRead + Unpin + Send>;

/// Term enumeration request / 词项枚举请求
#[derive(Debug, Clone)]
pub struct TermsRequest {
    /// Regular expression every returned term must match / 词项需匹配的正则
    pub regex: String,
    /// Field whose term dictionary is enumerated / 枚举的字段
    pub field: String,
    pub case_insensitive: bool,
    /// None means unlimited / None 表示不限制
    pub limit: Option<usize>,
    /// Time the service may spend on the request / 服务端允许耗时
    pub time_allowed: Duration,
}

/// Indexed term with its document frequency / 词项及其文档频率
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub term: String,
    pub frequency: u64,
}

/// Snippet (highlight) request for one document / 单文档片段（高亮）请求
#[derive(Debug, Clone)]
pub struct SnippetRequest {
    /// Already escaped query / 已转义的查询
    pub query: String,
    pub content_id: i64,
    /// Query targets the white-space field instead of a phrase in the default field / 查询空白分词字段
    pub regex: bool,
    /// Only confirm a match, a single fragment is enough / 仅需确认匹配
    pub verify_only: bool,
}

impl SnippetRequest {
    /// Build the highlight query sent to the service / 构造高亮查询
    pub fn highlight_query(&self, terms_field: &str) -> String {
        if self.regex {
            format!("{}:{}", terms_field, self.query)
        } else {
            format!("\"{}\"", self.query)
        }
    }

    /// Field the fragments are taken from / 片段来源字段
    pub fn highlight_field<'a>(&self, terms_field: &'a str) -> &'a str {
        if self.regex {
            terms_field
        } else {
            CONTENT_FIELD
        }
    }
}

/// Index service client interface / 索引服务客户端接口
#[async_trait]
pub trait IndexServiceClient: Send + Sync {
    /// Submit one document with its content (not committed) / 提交单个文档（不提交事务）
    async fn submit(&self, document: IndexDocument, stream: ContentStream) -> Result<(), IndexError>;

    /// Make submitted documents searchable / 提交事务
    async fn commit(&self) -> Result<(), IndexError>;

    /// Enumerate indexed terms matching a regex / 枚举匹配正则的词项
    async fn enumerate_terms(&self, request: &TermsRequest) -> Result<Vec<Term>, IndexError>;

    /// Field query, returns matching document ids / 字段查询，返回文档 id
    async fn query(&self, query: &str, rows: usize) -> Result<Vec<i64>, IndexError>;

    /// Highlighted snippet, empty if the document has no match / 高亮片段，无匹配时为空
    async fn snippet(&self, request: &SnippetRequest) -> Result<String, IndexError>;

    async fn close_core(&self) -> Result<(), IndexError>;

    async fn stop(&self) -> Result<(), IndexError>;

    async fn start(&self) -> Result<(), IndexError>;

    async fn open_core(&self) -> Result<(), IndexError>;

    /// Hard recovery: close core, stop, start, reopen core / 硬恢复：关闭核心、停止、启动、重新打开核心
    async fn restart(&self) -> Result<(), IndexError> {
        if let Err(e) = self.close_core().await {
            tracing::warn!("Error closing index core during restart: {}", e);
        }
        if let Err(e) = self.stop().await {
            tracing::warn!("Error stopping index service during restart: {}", e);
        }
        self.start().await?;
        self.open_core().await
    }
}
