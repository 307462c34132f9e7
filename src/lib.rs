//! Keyword indexing and search for forensic content / 取证内容的关键字索引与搜索
//!
//! Write side / 写入：content → `ingest::Ingester` → `search::IndexServiceClient`
//! Read side / 读取：`query::KeywordQuery` → `MatchSet` → `task::ResultWriter` → `blackboard::AnnotationStore`

pub mod blackboard;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod ingest;
pub mod lists;
pub mod logging;
pub mod query;
pub mod results;
pub mod search;
pub mod task;

#[cfg(test)]
mod test_support;

/// Module name recorded on attributes and events / 属性与事件中记录的模块名
pub const MODULE_NAME: &str = "Keyword Search";

pub use error::{KeywordSearchError, Result};
pub use query::{Keyword, KeywordQuery, MatchSet, SearchContext};
pub use results::{KeywordSearchManager, ResultRow};
