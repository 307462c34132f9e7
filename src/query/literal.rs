//! Literal phrase query / 字面短语查询

use super::{escape_lucene_query, record_hit, resolve_contents, snippet_or_empty, MatchSet, SearchContext, WriteResult};
use crate::content::FsContent;
use crate::error::{KeywordSearchError, Result};
use crate::search::SnippetRequest;

#[derive(Debug, Clone)]
pub struct LuceneQuery {
    query: String,
    escaped_query: String,
    escaped: bool,
}

impl LuceneQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            escaped_query: query.to_string(),
            escaped: false,
        }
    }

    pub fn validate(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn escape(&mut self) {
        self.escaped_query = escape_lucene_query(&self.query, true, false);
        self.escaped = true;
    }

    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    pub fn query_string(&self) -> &str {
        &self.query
    }

    pub fn escaped_query_string(&self) -> &str {
        &self.escaped_query
    }

    /// Phrase query sent to the index / 发送给索引的短语查询
    fn phrase(&self) -> String {
        format!("\"{}\"", self.escaped_query)
    }

    /// Single field query, keyed by the original string / 单次字段查询，以原始字符串为键
    pub async fn perform_query(&self, ctx: &SearchContext) -> Result<MatchSet> {
        if !self.validate() {
            return Err(KeywordSearchError::Validation("Empty literal query".to_string()));
        }
        let ids = ctx.index.query(&self.phrase(), ctx.config.max_rows).await?;
        tracing::debug!("Literal query '{}' matched {} documents", self.query, ids.len());

        let mut matches = MatchSet::new();
        matches.insert(self.query.clone(), resolve_contents(ctx, ids).await);
        Ok(matches)
    }

    /// Context snippet for display / 用于显示的上下文片段
    pub async fn context_snippet(&self, ctx: &SearchContext, content_id: i64) -> Result<String> {
        let request = SnippetRequest {
            query: self.escaped_query.clone(),
            content_id,
            regex: false,
            verify_only: false,
        };
        snippet_or_empty(ctx.index.snippet(&request).await, &self.query, content_id)
    }

    pub async fn write_to_blackboard(
        &self,
        ctx: &SearchContext,
        term: &str,
        content: &FsContent,
        list_name: Option<&str>,
    ) -> Result<Option<WriteResult>> {
        let request = SnippetRequest {
            query: self.escaped_query.clone(),
            content_id: content.id,
            regex: false,
            verify_only: true,
        };
        let snippet = snippet_or_empty(ctx.index.snippet(&request).await, term, content.id)?;
        if snippet.is_empty() {
            tracing::debug!("No snippet for '{}' in content {}, hit not recorded", term, content.id);
            return Ok(None);
        }

        // Literal hits carry an empty pattern / 字面命中的模式属性为空
        Ok(record_hit(ctx, content, term, list_name, snippet, "").await)
    }
}
