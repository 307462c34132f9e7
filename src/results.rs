//! Keyword search execution and result rows / 关键字搜索执行与结果行
//!
//! execute: validate → perform query → one row per matching file → spawn result writer
//! 执行：校验 → 查询 → 每个匹配文件一行 → 启动结果写入任务

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::KeywordSearchConfig;
use crate::content::{format_time, FsContent};
use crate::error::{KeywordSearchError, Result};
use crate::events::EventSink;
use crate::lists::KeywordLists;
use crate::query::{highlight_query, Keyword, KeywordQuery, LuceneQuery, MatchSet, SearchContext};
use crate::task::{WriterHandle, WriterSupervisor};

/// One matching file / 单个匹配文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub content_id: i64,
    pub name: String,
    pub path: String,
    pub size: u64,
    /// Timestamps in the owning image's time zone / 所属镜像时区的时间
    pub mtime: String,
    pub ctime: String,
    pub atime: String,
    pub crtime: String,
    pub keyword: String,
    pub regex: bool,
    /// Matched file name / 匹配的文件名
    #[serde(rename = "match")]
    pub matched: String,
    /// Context snippet, literal queries only / 上下文片段（仅字面查询）
    pub context: Option<String>,
    /// Query used to highlight this file / 用于高亮的查询
    pub highlight_query: String,
}

/// Result of one keyword search / 单次关键字搜索结果
pub struct SearchOutcome {
    pub query: KeywordQuery,
    pub matches: MatchSet,
    pub list_name: Option<String>,
    pub rows: Vec<ResultRow>,
    /// Writer recording the hits in the background / 后台写入命中的任务
    pub writer: WriterHandle,
}

pub struct KeywordSearchManager {
    supervisor: WriterSupervisor,
    lists: KeywordLists,
}

impl KeywordSearchManager {
    pub fn new(supervisor: WriterSupervisor, lists: KeywordLists) -> Self {
        Self { supervisor, lists }
    }

    /// Build a manager for one analysis session / 为分析会话创建管理器
    pub fn from_config(ctx: SearchContext, sink: Arc<dyn EventSink>, config: &KeywordSearchConfig) -> Self {
        let supervisor = WriterSupervisor::new(ctx, sink, config.writer.clone());
        Self::new(supervisor, KeywordLists::new(config.lists.clone()))
    }

    pub fn supervisor(&self) -> &WriterSupervisor {
        &self.supervisor
    }

    pub fn lists(&self) -> &KeywordLists {
        &self.lists
    }

    fn ctx(&self) -> &SearchContext {
        self.supervisor.context()
    }

    /// Run one keyword, rows collapsed per file / 执行单个关键字，按文件合并
    pub async fn execute(&self, keyword: &Keyword) -> Result<SearchOutcome> {
        let mut query = KeywordQuery::new(keyword);
        if query.is_literal() {
            query.escape();
        }
        if !query.validate() {
            return Err(KeywordSearchError::Validation(format!(
                "'{}' is not a valid {} query",
                keyword.query,
                if keyword.literal { "literal" } else { "regular expression" }
            )));
        }

        let matches = query.perform_query(self.ctx()).await?;
        let list_name = self
            .lists
            .list_with_keyword(query.query_string())
            .map(|list| list.name.clone());

        let mut rows = Vec::new();
        for content in matches.distinct_contents() {
            let context = match &query {
                KeywordQuery::Literal(literal) => Some(literal.context_snippet(self.ctx(), content.id).await?),
                KeywordQuery::RegexTerm(_) => None,
            };
            let highlight = highlight_query(&query, &matches, &content, &self.ctx().config.terms_field);
            rows.push(self.row(&content, &query, context, highlight));
        }
        tracing::info!("Keyword '{}' matched {} files", keyword.query, rows.len());

        let writer = self.supervisor.spawn(query.clone(), matches.clone(), list_name.clone());
        Ok(SearchOutcome { query, matches, list_name, rows, writer })
    }

    /// Run every keyword of a list, invalid keywords skipped / 执行列表中的全部关键字
    ///
    /// Stops at the first unavailable-index error / 索引不可用时停止
    pub async fn execute_list(&self, list_name: &str) -> Result<Vec<SearchOutcome>> {
        let list = self
            .lists
            .get(list_name)
            .ok_or_else(|| KeywordSearchError::Validation(format!("No keyword list named '{}'", list_name)))?;

        let mut outcomes = Vec::new();
        for keyword in &list.keywords {
            match self.execute(keyword).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_index_unavailable() => return Err(e),
                Err(e) => tracing::warn!("Skipping keyword '{}' of list '{}': {}", keyword.query, list_name, e),
            }
        }
        Ok(outcomes)
    }

    /// Files of one enumerated term, for a detail view / 单个词项的文件（明细视图）
    pub async fn execute_term(&self, term: &str) -> Result<SearchOutcome> {
        let mut literal = LuceneQuery::new(term);
        literal.escape();
        let matches = literal.perform_query(self.ctx()).await?;
        let query = KeywordQuery::Literal(literal);

        let rows = matches
            .distinct_contents()
            .iter()
            .map(|content| self.row(content, &query, None, term.to_string()))
            .collect();

        let writer = self.supervisor.spawn(query.clone(), matches.clone(), None);
        Ok(SearchOutcome { query, matches, list_name: None, rows, writer })
    }

    /// Cancel all writers of this session / 取消本会话的全部写入任务
    pub fn stop_all_writers(&self) -> usize {
        self.supervisor.stop_all()
    }

    fn row(&self, content: &FsContent, query: &KeywordQuery, context: Option<String>, highlight: String) -> ResultRow {
        let tz = self.ctx().content.timezone_of(content);
        ResultRow {
            content_id: content.id,
            name: content.name.clone(),
            path: content.path.clone(),
            size: content.size,
            mtime: format_time(content.mtime, &tz),
            ctime: format_time(content.ctime, &tz),
            atime: format_time(content.atime, &tz),
            crtime: format_time(content.crtime, &tz),
            keyword: query.query_string().to_string(),
            regex: !query.is_literal(),
            matched: content.name.clone(),
            context,
            highlight_query: highlight,
        }
    }
}
