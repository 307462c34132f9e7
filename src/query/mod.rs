//! Keyword queries / 关键字查询
//!
//! Two query kinds behind one closed type / 两种查询封装在同一枚举中：
//! - `Literal` (`LuceneQuery`): exact phrase in the default field / 默认字段中的精确短语
//! - `RegexTerm` (`TermComponentQuery`): term enumeration then per-term resolution / 词项枚举后逐词解析
//!
//! Flow / 流程：validate → (escape) → perform_query → write_to_blackboard (per term and file)

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::blackboard::{AnnotationStore, Artifact, ArtifactType, Attribute, AttributeType};
use crate::config::QueryConfig;
use crate::content::{ContentModel, FsContent};
use crate::error::{IndexError, KeywordSearchError, Result};
use crate::search::IndexServiceClient;
use crate::MODULE_NAME;

pub mod escape;
pub mod highlight;
pub mod literal;
pub mod match_set;
pub mod term;

pub use escape::escape_lucene_query;
pub use highlight::highlight_query;
pub use literal::LuceneQuery;
pub use match_set::MatchSet;
pub use term::TermComponentQuery;

/// Search keyword / 搜索关键字
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
    pub query: String,
    /// Literal phrase, or regular expression when false / 字面短语，false 表示正则
    #[serde(default = "default_literal")]
    pub literal: bool,
}

fn default_literal() -> bool {
    true
}

impl Keyword {
    pub fn literal(query: impl Into<String>) -> Self {
        Self { query: query.into(), literal: true }
    }

    pub fn regex(query: impl Into<String>) -> Self {
        Self { query: query.into(), literal: false }
    }
}

/// Collaborators a query runs against / 查询依赖的协作者
#[derive(Clone)]
pub struct SearchContext {
    pub index: Arc<dyn IndexServiceClient>,
    pub content: Arc<dyn ContentModel>,
    pub store: Arc<dyn AnnotationStore>,
    pub config: QueryConfig,
}

/// Artifact just written, with its attributes / 刚写入的结果及其属性
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub artifact: Artifact,
    pub attributes: Vec<Attribute>,
}

/// Keyword query / 关键字查询
#[derive(Debug, Clone)]
pub enum KeywordQuery {
    Literal(LuceneQuery),
    RegexTerm(TermComponentQuery),
}

impl KeywordQuery {
    pub fn new(keyword: &Keyword) -> Self {
        if keyword.literal {
            KeywordQuery::Literal(LuceneQuery::new(&keyword.query))
        } else {
            KeywordQuery::RegexTerm(TermComponentQuery::new(&keyword.query))
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, KeywordQuery::Literal(_))
    }

    /// Local syntax check, no I/O / 本地语法检查
    pub fn validate(&self) -> bool {
        match self {
            KeywordQuery::Literal(q) => q.validate(),
            KeywordQuery::RegexTerm(q) => q.validate(),
        }
    }

    pub fn escape(&mut self) {
        match self {
            KeywordQuery::Literal(q) => q.escape(),
            KeywordQuery::RegexTerm(q) => q.escape(),
        }
    }

    pub fn is_escaped(&self) -> bool {
        match self {
            KeywordQuery::Literal(q) => q.is_escaped(),
            KeywordQuery::RegexTerm(q) => q.is_escaped(),
        }
    }

    /// Original query string / 原始查询字符串
    pub fn query_string(&self) -> &str {
        match self {
            KeywordQuery::Literal(q) => q.query_string(),
            KeywordQuery::RegexTerm(q) => q.query_string(),
        }
    }

    /// Last escaped form, the original until escaped / 最近转义形式
    pub fn escaped_query_string(&self) -> &str {
        match self {
            KeywordQuery::Literal(q) => q.escaped_query_string(),
            KeywordQuery::RegexTerm(q) => q.escaped_query_string(),
        }
    }

    /// Run the query against the index / 执行查询
    pub async fn perform_query(&mut self, ctx: &SearchContext) -> Result<MatchSet> {
        match self {
            KeywordQuery::Literal(q) => q.perform_query(ctx).await,
            KeywordQuery::RegexTerm(q) => q.perform_query(ctx).await,
        }
    }

    /// Verify a hit and record it / 确认命中并写入结果
    pub async fn write_to_blackboard(
        &self,
        ctx: &SearchContext,
        term: &str,
        content: &FsContent,
        list_name: Option<&str>,
    ) -> Result<Option<WriteResult>> {
        match self {
            KeywordQuery::Literal(q) => q.write_to_blackboard(ctx, term, content, list_name).await,
            KeywordQuery::RegexTerm(q) => q.write_to_blackboard(ctx, term, content, list_name).await,
        }
    }
}

/// Resolve document ids to content, unknown ids skipped / 将文档 id 解析为内容
pub(crate) async fn resolve_contents(ctx: &SearchContext, ids: Vec<i64>) -> Vec<FsContent> {
    let mut contents = Vec::with_capacity(ids.len());
    for id in ids {
        match ctx.content.content_by_id(id).await {
            Ok(Some(content)) => contents.push(content),
            Ok(None) => tracing::debug!("Indexed document {} has no content item", id),
            Err(e) => tracing::warn!("Error looking up content {}: {}", id, e),
        }
    }
    contents
}

/// Snippet failures other than unavailability are treated as "no snippet" / 非不可用错误视为无片段
pub(crate) fn snippet_or_empty(result: std::result::Result<String, IndexError>, term: &str, content_id: i64) -> Result<String> {
    match result {
        Ok(snippet) => Ok(snippet),
        Err(e) if e.is_unavailable() => Err(e.into()),
        Err(e) => {
            tracing::warn!("Error getting snippet for '{}' in content {}: {}", term, content_id, e);
            Ok(String::new())
        }
    }
}

/// Create a keyword-hit artifact with its four attributes / 创建关键字命中结果及四个属性
///
/// Store failures are logged and give None / 存储失败记录日志并返回 None
pub(crate) async fn record_hit(
    ctx: &SearchContext,
    content: &FsContent,
    term: &str,
    list_name: Option<&str>,
    snippet: String,
    pattern: &str,
) -> Option<WriteResult> {
    let attributes = vec![
        Attribute::new(AttributeType::Keyword, MODULE_NAME, term),
        Attribute::new(AttributeType::KeywordSet, MODULE_NAME, list_name.unwrap_or_default()),
        Attribute::new(AttributeType::KeywordPreview, MODULE_NAME, snippet),
        Attribute::new(AttributeType::KeywordRegexp, MODULE_NAME, pattern),
    ];

    let written = async {
        let mut artifact = ctx
            .store
            .create_artifact(content.id, ArtifactType::KeywordHit)
            .await
            .map_err(|e| KeywordSearchError::AttributeWrite(e.to_string()))?;
        if let Err(e) = ctx.store.add_attributes(artifact.id, attributes.clone()).await {
            // No hit without its full attribute set / 命中结果必须带完整属性
            if let Err(remove_err) = ctx.store.remove_artifact(artifact.id).await {
                tracing::warn!("Cannot remove incomplete artifact {}: {}", artifact.id, remove_err);
            }
            return Err(KeywordSearchError::AttributeWrite(e.to_string()));
        }
        artifact.attributes = attributes.clone();
        Ok::<_, KeywordSearchError>(artifact)
    }
    .await;

    match written {
        Ok(artifact) => Some(WriteResult { artifact, attributes }),
        Err(e) => {
            tracing::warn!("Error adding keyword hit '{}' to content {}: {}", term, content.id, e);
            None
        }
    }
}
