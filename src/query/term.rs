//! Regex query over the term dictionary / 基于词项字典的正则查询
//!
//! 1. Enumerate indexed terms matching the regex (case-insensitive, unlimited) / 枚举匹配词项
//! 2. Resolve the files of every term with a field query / 逐词查询匹配文件
//!
//! A failing term is skipped, an unavailable index aborts / 单词项失败跳过，索引不可用则中止

use regex::Regex;

use super::{escape_lucene_query, record_hit, resolve_contents, snippet_or_empty, MatchSet, SearchContext, WriteResult};
use crate::content::FsContent;
use crate::error::{KeywordSearchError, Result};
use crate::search::{SnippetRequest, Term, TermsRequest};

#[derive(Debug, Clone)]
pub struct TermComponentQuery {
    query: String,
    escaped_query: String,
    escaped: bool,
    terms: Vec<Term>,
}

impl TermComponentQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            escaped_query: query.to_string(),
            escaped: false,
            terms: Vec::new(),
        }
    }

    /// Pattern sent to the index / 发送给索引的模式
    fn pattern(&self) -> &str {
        if self.escaped {
            &self.escaped_query
        } else {
            &self.query
        }
    }

    pub fn validate(&self) -> bool {
        let pattern = self.pattern();
        !pattern.is_empty() && Regex::new(pattern).is_ok()
    }

    /// Quote the pattern so it matches itself literally / 将模式转为字面匹配
    pub fn escape(&mut self) {
        self.escaped_query = regex::escape(&self.query);
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

    /// Terms found by the last execution / 最近一次执行得到的词项
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    async fn enumerate(&mut self, ctx: &SearchContext) -> Result<()> {
        let request = TermsRequest {
            regex: self.pattern().to_string(),
            field: ctx.config.terms_field.clone(),
            case_insensitive: true,
            limit: None,
            time_allowed: ctx.config.terms_time_allowed(),
        };

        self.terms = match ctx.index.enumerate_terms(&request).await {
            Ok(terms) => terms,
            Err(e) if e.is_unavailable() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Error executing the regex terms query '{}': {}", self.query, e);
                Vec::new()
            }
        };
        tracing::debug!("Regex '{}' matched {} terms", self.query, self.terms.len());
        Ok(())
    }

    pub async fn perform_query(&mut self, ctx: &SearchContext) -> Result<MatchSet> {
        if !self.validate() {
            return Err(KeywordSearchError::Validation(format!(
                "'{}' is not a valid regular expression",
                self.query
            )));
        }
        self.enumerate(ctx).await?;

        let mut matches = MatchSet::new();
        for term in &self.terms {
            let field_query = format!(
                "{}:{}",
                ctx.config.terms_field,
                escape_lucene_query(&term.term, true, false)
            );
            let ids = match ctx.index.query(&field_query, ctx.config.max_rows).await {
                Ok(ids) => ids,
                Err(e) if e.is_unavailable() => return Err(KeywordSearchError::from(e)),
                Err(e) => {
                    tracing::warn!("Error executing term query for '{}', skipping: {}", term.term, e);
                    continue;
                }
            };

            let contents = resolve_contents(ctx, ids).await;
            if !contents.is_empty() {
                matches.insert(term.term.clone(), contents);
            }
        }
        Ok(matches)
    }

    pub async fn write_to_blackboard(
        &self,
        ctx: &SearchContext,
        term: &str,
        content: &FsContent,
        list_name: Option<&str>,
    ) -> Result<Option<WriteResult>> {
        let request = SnippetRequest {
            query: escape_lucene_query(term, true, false),
            content_id: content.id,
            regex: true,
            verify_only: true,
        };
        let snippet = snippet_or_empty(ctx.index.snippet(&request).await, term, content.id)?;
        if snippet.is_empty() {
            tracing::debug!("No snippet for term '{}' in content {}, hit not recorded", term, content.id);
            return Ok(None);
        }

        Ok(record_hit(ctx, content, term, list_name, snippet, &self.query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::{AnnotationStore, KeywordHit};
    use crate::error::IndexError;
    use crate::test_support::{context_with, indexed_context, sample_file, FakeIndex};
    use std::sync::Arc;

    #[test]
    fn test_validate() {
        assert!(TermComponentQuery::new("mayt.g").validate());
        assert!(!TermComponentQuery::new("mayt(g").validate());
        assert!(!TermComponentQuery::new("").validate());

        let mut query = TermComponentQuery::new("mayt(g");
        query.escape();
        assert!(query.validate());
        assert_eq!(query.escaped_query_string(), r"mayt\(g");
    }

    #[tokio::test]
    async fn test_invalid_pattern_never_reaches_index() {
        let index = Arc::new(FakeIndex::new());
        let (ctx, _) = context_with(index.clone(), &[]);

        let mut query = TermComponentQuery::new("mayt(g");
        let err = query.perform_query(&ctx).await.unwrap_err();
        assert!(matches!(err, KeywordSearchError::Validation(_)));
        assert!(index.terms_requests().is_empty());
        assert!(index.queries().is_empty());
    }

    #[tokio::test]
    async fn test_two_terms_two_sets() {
        let (ctx, _) = indexed_context(&[
            (1, "a.txt", "the maytag dryer"),
            (2, "b.txt", "a mayteg washer"),
            (3, "c.txt", "maytag again, and mayteg"),
            (4, "d.txt", "whirlpool"),
        ])
        .await;

        let mut query = TermComponentQuery::new("mayt.g");
        let matches = query.perform_query(&ctx).await.unwrap();

        assert_eq!(matches.len(), 2);
        let ids = |term: &str| -> Vec<i64> { matches.get(term).unwrap().iter().map(|c| c.id).collect() };
        assert_eq!(ids("maytag"), vec![1, 3]);
        assert_eq!(ids("mayteg"), vec![2, 3]);

        let enumerated: Vec<&str> = query.terms().iter().map(|t| t.term.as_str()).collect();
        for term in matches.terms() {
            assert!(enumerated.contains(&term));
        }
    }

    #[tokio::test]
    async fn test_failing_term_is_skipped() {
        let index = Arc::new(FakeIndex::new());
        index.set_terms(&["maytag", "mayteg"]);
        index.set_query("content_ws:maytag", &[1]);
        index.fail_query("content_ws:mayteg", IndexError::Request("boom".into()));
        let (ctx, _) = context_with(index, &[sample_file(1, "a.txt", 10)]);

        let matches = TermComponentQuery::new("mayt.g").perform_query(&ctx).await.unwrap();
        assert_eq!(matches.terms().collect::<Vec<_>>(), vec!["maytag"]);
    }

    #[tokio::test]
    async fn test_term_without_files_is_omitted() {
        let index = Arc::new(FakeIndex::new());
        index.set_terms(&["maytag", "mayteg"]);
        index.set_query("content_ws:maytag", &[1]);
        index.set_query("content_ws:mayteg", &[99]);
        let (ctx, _) = context_with(index, &[sample_file(1, "a.txt", 10)]);

        let mut query = TermComponentQuery::new("mayt.g");
        let matches = query.perform_query(&ctx).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(query.terms().len(), 2);
    }

    #[tokio::test]
    async fn test_enumeration_failures() {
        let index = Arc::new(FakeIndex::new());
        index.fail_terms(IndexError::NoOpenCore("down".into()));
        let (ctx, _) = context_with(index.clone(), &[]);
        let err = TermComponentQuery::new("mayt.g").perform_query(&ctx).await.unwrap_err();
        assert!(err.is_index_unavailable());

        index.fail_terms(IndexError::Request("time allowed exceeded".into()));
        let matches = TermComponentQuery::new("mayt.g").perform_query(&ctx).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_enumeration_request() {
        let index = Arc::new(FakeIndex::new());
        let (ctx, _) = context_with(index.clone(), &[]);
        TermComponentQuery::new("mayt.g").perform_query(&ctx).await.unwrap();

        let request = index.terms_requests().pop().unwrap();
        assert_eq!(request.regex, "mayt.g");
        assert_eq!(request.field, "content_ws");
        assert!(request.case_insensitive);
        assert_eq!(request.limit, None);
        assert_eq!(request.time_allowed.as_secs(), 90);
    }

    #[tokio::test]
    async fn test_write_to_blackboard() {
        let file = sample_file(8, "x.txt", 10);
        let index = Arc::new(FakeIndex::new());
        let (ctx, store) = context_with(index.clone(), &[file.clone()]);
        let query = TermComponentQuery::new("mayt.g");

        assert!(query.write_to_blackboard(&ctx, "maytag", &file, Some("MyList")).await.unwrap().is_none());
        assert!(store.is_empty());

        index.set_snippet(8, "...the maytag dryer...");
        let written = query
            .write_to_blackboard(&ctx, "maytag", &file, Some("MyList"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(written.attributes.len(), 4);

        let stored = store.artifacts_for(8).await.unwrap();
        let hit = KeywordHit::from_artifact(&stored[0]).unwrap();
        assert_eq!(hit.keyword, "maytag");
        assert_eq!(hit.list_name, "MyList");
        assert_eq!(hit.preview, "...the maytag dryer...");
        assert_eq!(hit.pattern, "mayt.g");
        assert!(hit.is_regex());

        let request = index.snippet_requests().pop().unwrap();
        assert!(request.regex);
        assert_eq!(request.query, "maytag");
    }

    #[tokio::test]
    async fn test_write_propagates_unavailable() {
        let file = sample_file(8, "x.txt", 10);
        let index = Arc::new(FakeIndex::new());
        index.fail_snippet(IndexError::NoOpenCore("down".into()));
        let (ctx, store) = context_with(index, &[file.clone()]);

        let err = TermComponentQuery::new("mayt.g")
            .write_to_blackboard(&ctx, "maytag", &file, None)
            .await
            .unwrap_err();
        assert!(err.is_index_unavailable());
        assert!(store.is_empty());
    }
}
