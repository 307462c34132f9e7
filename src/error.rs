//! Error types for keyword indexing and search / 关键字索引与搜索错误类型

use thiserror::Error;

/// Error reported by an index service client / 索引服务客户端错误
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// The service cannot be reached or no core is open / 服务不可达或核心未打开
    #[error("No open index core: {0}")]
    NoOpenCore(String),

    /// The service answered, but the request failed / 请求失败
    #[error("Index request failed: {0}")]
    Request(String),

    /// The submitted content could not be read / 内容读取失败
    #[error("Problem reading content: {0}")]
    Content(String),
}

impl IndexError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, IndexError::NoOpenCore(_))
    }
}

/// Keyword search error taxonomy / 关键字搜索错误分类
#[derive(Debug, Error)]
pub enum KeywordSearchError {
    /// Local validation failed, nothing was sent to the index / 本地校验失败
    #[error("Invalid query: {0}")]
    Validation(String),

    /// A single submission exceeded its size-scaled budget / 提交超时
    #[error("Index request time out for id: {id}, name: {name}")]
    Timeout { id: i64, name: String },

    /// Any other per-item submission failure / 单个文件提交失败
    #[error("Problem posting content to index, id: {id}, name: {name}")]
    Ingestion {
        id: i64,
        name: String,
        #[source]
        source: IndexError,
    },

    /// The index cannot be reached or queried / 索引不可用
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Persisting an artifact failed / 写入结果失败
    #[error("Error writing artifact: {0}")]
    AttributeWrite(String),

    /// Flushing the index failed / 提交索引失败
    #[error("Error committing index: {0}")]
    Commit(#[source] IndexError),

    /// A read-side request failed for a reason other than unavailability / 查询失败
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KeywordSearchError {
    /// Only this class aborts a whole query or write batch / 只有此类错误会中止整批处理
    pub fn is_index_unavailable(&self) -> bool {
        matches!(self, KeywordSearchError::IndexUnavailable(_))
    }
}

impl From<IndexError> for KeywordSearchError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NoOpenCore(msg) => KeywordSearchError::IndexUnavailable(msg),
            other => KeywordSearchError::Query(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeywordSearchError>;
