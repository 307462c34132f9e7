//! In-memory index - inverted index implementation of the index service / 内存索引
//!
//! Architecture principle: only expose primitive operations, do not control flow / 架构原则
//! - submit: buffer a document until the next commit / 缓存文档直到下次提交
//! - commit: make buffered documents searchable / 使缓存文档可被搜索
//! - enumerate_terms: regex over the term dictionary of a field / 对字段词典做正则匹配
//! - query: term / phrase query on one field / 单字段词项或短语查询
//! - snippet: highlighted fragment around the first match / 首个匹配处的高亮片段

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncReadExt;

use super::schema::IndexDocument;
use super::tokenizer::{tokenize_field, unescape};
use super::{ContentStream, IndexServiceClient, SnippetRequest, Term, TermsRequest, CONTENT_FIELD};
use crate::config::QueryConfig;
use crate::error::IndexError;

/// Separator class between tokens of the standard field / 标准字段的分隔字符
const STANDARD_SEPARATOR: &str = r"[^\p{Alphabetic}\p{N}]";

/// Stored document / 已存储文档
#[derive(Debug, Clone)]
struct StoredDocument {
    document: IndexDocument,
    text: String,
    /// field -> token sequence / 字段 -> 词序列
    tokens: HashMap<String, Vec<String>>,
}

/// Parsed query / 解析后的查询
#[derive(Debug, PartialEq)]
struct ParsedQuery {
    field: String,
    tokens: Vec<String>,
    phrase: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub pending_count: usize,
    pub term_count: usize,
    pub restart_count: usize,
    pub last_updated: Option<i64>,
}

/// In-memory index / 内存索引
pub struct MemoryIndex {
    terms_field: String,
    fragment_size: usize,
    highlight_pre: String,
    highlight_post: String,
    /// Committed documents: id -> document / 已提交文档
    documents: RwLock<HashMap<i64, StoredDocument>>,
    /// Submitted, not yet committed / 已提交未生效的文档
    pending: Mutex<Vec<StoredDocument>>,
    /// Inverted index: field -> term -> doc ids / 倒排索引
    inverted_index: RwLock<HashMap<String, BTreeMap<String, BTreeSet<i64>>>>,
    running: AtomicBool,
    core_open: AtomicBool,
    /// Lifecycle calls, in order / 生命周期调用记录
    lifecycle: Mutex<Vec<&'static str>>,
    stats: Mutex<IndexStats>,
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}

impl MemoryIndex {
    /// Create new in-memory index / 创建内存索引
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            terms_field: config.terms_field.clone(),
            fragment_size: config.snippet_fragment_size,
            highlight_pre: config.highlight_pre.clone(),
            highlight_post: config.highlight_post.clone(),
            documents: RwLock::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            inverted_index: RwLock::new(HashMap::new()),
            running: AtomicBool::new(true),
            core_open: AtomicBool::new(true),
            lifecycle: Mutex::new(Vec::new()),
            stats: Mutex::new(IndexStats::default()),
        }
    }

    /// Get index statistics / 获取索引统计信息
    pub fn stats(&self) -> IndexStats {
        let mut stats = self.stats.lock().clone();
        stats.pending_count = self.pending.lock().len();
        stats
    }

    /// Lifecycle calls made so far / 已发生的生命周期调用
    pub fn lifecycle_log(&self) -> Vec<&'static str> {
        self.lifecycle.lock().clone()
    }

    fn record(&self, call: &'static str) {
        self.lifecycle.lock().push(call);
    }

    fn ensure_available(&self) -> Result<(), IndexError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(IndexError::NoOpenCore("Index service is not running".to_string()));
        }
        if !self.core_open.load(Ordering::SeqCst) {
            return Err(IndexError::NoOpenCore("No index core open".to_string()));
        }
        Ok(())
    }

    fn analyze(&self, document: IndexDocument, text: String) -> StoredDocument {
        let mut tokens = HashMap::new();
        for field in [CONTENT_FIELD, self.terms_field.as_str()] {
            tokens.insert(field.to_string(), tokenize_field(field, &text, &self.terms_field));
        }
        StoredDocument { document, text, tokens }
    }

    /// Parse `[field:]value` or `[field:]"phrase"` / 解析查询
    fn parse_query(&self, query: &str) -> ParsedQuery {
        let query = query.trim();
        let (field, rest) = split_field(query).unwrap_or((CONTENT_FIELD, query));

        let quoted = rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"') && !rest.ends_with("\\\"");
        let value = if quoted { &rest[1..rest.len() - 1] } else { rest };
        let value = unescape(value);

        ParsedQuery {
            field: field.to_string(),
            tokens: tokenize_field(field, &value, &self.terms_field),
            phrase: quoted,
        }
    }

    fn matching_documents(&self, parsed: &ParsedQuery) -> BTreeSet<i64> {
        let index = self.inverted_index.read();
        let Some(dictionary) = index.get(&parsed.field) else {
            return BTreeSet::new();
        };
        let postings = |token: &String| dictionary.get(token).cloned().unwrap_or_default();

        if !parsed.phrase {
            return parsed.tokens.iter().flat_map(|t| postings(t)).collect();
        }

        // Phrase: all tokens present, then adjacency check / 短语：先求交集再检查相邻
        let mut candidates: Option<BTreeSet<i64>> = None;
        for token in &parsed.tokens {
            let ids = postings(token);
            candidates = Some(match candidates {
                Some(current) => current.intersection(&ids).copied().collect(),
                None => ids,
            });
        }
        let candidates = candidates.unwrap_or_default();

        let documents = self.documents.read();
        candidates
            .into_iter()
            .filter(|id| {
                documents
                    .get(id)
                    .and_then(|doc| doc.tokens.get(&parsed.field))
                    .map(|seq| contains_sequence(seq, &parsed.tokens))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Fragment around the first match in stored text / 首个匹配处的片段
    fn fragment(&self, text: &str, parsed: &ParsedQuery) -> Option<String> {
        let ws = parsed.field == self.terms_field;
        let separator = if ws { r"\s" } else { STANDARD_SEPARATOR };
        let escaped: Vec<String> = parsed.tokens.iter().map(|t| regex::escape(t)).collect();
        let body = if parsed.phrase {
            escaped.join(&format!("{}+", separator))
        } else {
            format!("(?:{})", escaped.join("|"))
        };
        let pattern = format!("(?:^|{sep})({body})(?:{sep}|$)", sep = separator, body = body);
        let matcher = RegexBuilder::new(&pattern).case_insensitive(!ws).build().ok()?;

        let found = matcher.captures(text)?.get(1)?;
        let matched = found.as_str();
        let context = self.fragment_size.saturating_sub(matched.chars().count()) / 2;

        let before: String = {
            let chars: Vec<char> = text[..found.start()].chars().collect();
            chars[chars.len().saturating_sub(context)..].iter().collect()
        };
        let after: String = text[found.end()..].chars().take(context).collect();

        let fragment = format!(
            "{}{}{}{}{}",
            before, self.highlight_pre, matched, self.highlight_post, after
        );
        Some(fragment.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Split a leading `field:` prefix / 拆分字段前缀
fn split_field(query: &str) -> Option<(&str, &str)> {
    let pos = query.find(':')?;
    let field = &query[..pos];
    let mut chars = field.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((field, &query[pos + 1..]))
}

fn contains_sequence(seq: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() {
        return false;
    }
    seq.windows(phrase.len()).any(|w| w == phrase)
}

#[async_trait]
impl IndexServiceClient for MemoryIndex {
    async fn submit(&self, document: IndexDocument, mut stream: ContentStream) -> Result<(), IndexError> {
        self.ensure_available()?;

        let mut data = Vec::new();
        stream
            .read_to_end(&mut data)
            .await
            .map_err(|e| IndexError::Content(e.to_string()))?;
        let text = String::from_utf8_lossy(&data).to_string();

        let stored = self.analyze(document, text);
        self.pending.lock().push(stored);
        Ok(())
    }

    async fn commit(&self) -> Result<(), IndexError> {
        self.ensure_available()?;

        let pending: Vec<StoredDocument> = std::mem::take(&mut *self.pending.lock());
        if pending.is_empty() {
            return Ok(());
        }

        let mut documents = self.documents.write();
        let mut index = self.inverted_index.write();
        for stored in pending {
            let id = stored.document.id;

            // Re-submitted document replaces the old postings / 重复提交时替换旧倒排
            if let Some(old) = documents.remove(&id) {
                for (field, tokens) in &old.tokens {
                    if let Some(dictionary) = index.get_mut(field) {
                        for token in tokens {
                            if let Some(ids) = dictionary.get_mut(token) {
                                ids.remove(&id);
                                if ids.is_empty() {
                                    dictionary.remove(token);
                                }
                            }
                        }
                    }
                }
            }

            for (field, tokens) in &stored.tokens {
                let dictionary = index.entry(field.clone()).or_default();
                for token in tokens {
                    dictionary.entry(token.clone()).or_default().insert(id);
                }
            }
            documents.insert(id, stored);
        }

        let mut stats = self.stats.lock();
        stats.document_count = documents.len();
        stats.term_count = index.values().map(|d| d.len()).sum();
        stats.last_updated = Some(chrono::Utc::now().timestamp());
        Ok(())
    }

    async fn enumerate_terms(&self, request: &TermsRequest) -> Result<Vec<Term>, IndexError> {
        self.ensure_available()?;

        let matcher = RegexBuilder::new(&format!("^(?:{})$", request.regex))
            .case_insensitive(request.case_insensitive)
            .build()
            .map_err(|e| IndexError::Request(format!("Invalid terms regex: {}", e)))?;

        let index = self.inverted_index.read();
        let Some(dictionary) = index.get(&request.field) else {
            return Ok(Vec::new());
        };

        let terms = dictionary
            .iter()
            .filter(|(term, _)| matcher.is_match(term))
            .map(|(term, ids)| Term { term: term.clone(), frequency: ids.len() as u64 })
            .take(request.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(terms)
    }

    async fn query(&self, query: &str, rows: usize) -> Result<Vec<i64>, IndexError> {
        self.ensure_available()?;

        let parsed = self.parse_query(query);
        if parsed.tokens.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.matching_documents(&parsed).into_iter().take(rows).collect())
    }

    async fn snippet(&self, request: &SnippetRequest) -> Result<String, IndexError> {
        self.ensure_available()?;

        let parsed = self.parse_query(&request.highlight_query(&self.terms_field));
        if parsed.tokens.is_empty() {
            return Ok(String::new());
        }

        let documents = self.documents.read();
        let Some(doc) = documents.get(&request.content_id) else {
            return Ok(String::new());
        };
        Ok(self.fragment(&doc.text, &parsed).unwrap_or_default())
    }

    async fn close_core(&self) -> Result<(), IndexError> {
        self.record("close_core");
        self.core_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), IndexError> {
        self.record("stop");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&self) -> Result<(), IndexError> {
        self.record("start");
        self.running.store(true, Ordering::SeqCst);
        self.stats.lock().restart_count += 1;
        Ok(())
    }

    async fn open_core(&self) -> Result<(), IndexError> {
        self.record("open_core");
        if !self.running.load(Ordering::SeqCst) {
            return Err(IndexError::NoOpenCore("Index service is not running".to_string()));
        }
        self.core_open.store(true, Ordering::SeqCst);
        Ok(())
    }
}
