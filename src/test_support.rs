//! Scriptable collaborators for unit tests / 单元测试用的可编排协作者

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::blackboard::{AnnotationStore, Artifact, ArtifactType, Attribute, MemoryBlackboard};
use crate::config::QueryConfig;
use crate::content::{FsContent, MemoryContentModel};
use crate::error::IndexError;
use crate::query::SearchContext;
use crate::search::{ContentStream, IndexDocument, IndexServiceClient, MemoryIndex, SnippetRequest, Term, TermsRequest};

pub fn sample_file(id: i64, name: &str, size: u64) -> FsContent {
    FsContent {
        id,
        name: name.to_string(),
        path: format!("/{}", name),
        size,
        mtime: 0,
        ctime: 0,
        atime: 0,
        crtime: 0,
        fs_id: 1,
    }
}

/// Context over the given index and files / 基于给定索引与文件的上下文
pub fn context_with(index: Arc<dyn IndexServiceClient>, files: &[FsContent]) -> (SearchContext, Arc<MemoryBlackboard>) {
    let model = MemoryContentModel::new();
    for file in files {
        model.add_file(file.clone(), Vec::new());
    }
    let store = Arc::new(MemoryBlackboard::new());
    let ctx = SearchContext {
        index,
        content: Arc::new(model),
        store: store.clone(),
        config: QueryConfig::default(),
    };
    (ctx, store)
}

/// Context over a committed `MemoryIndex` holding the given documents / 基于已提交内存索引的上下文
pub async fn indexed_context(docs: &[(i64, &str, &str)]) -> (SearchContext, Arc<MemoryBlackboard>) {
    let index = Arc::new(MemoryIndex::default());
    let model = MemoryContentModel::new();
    for (id, name, text) in docs {
        let file = sample_file(*id, name, text.len() as u64);
        model.add_file(file.clone(), text.as_bytes().to_vec());
        let stream: ContentStream = Box::new(Cursor::new(text.as_bytes().to_vec()));
        index
            .submit(IndexDocument::from_content(&file), stream)
            .await
            .expect("submit to memory index");
    }
    index.commit().await.expect("commit memory index");

    let store = Arc::new(MemoryBlackboard::new());
    let ctx = SearchContext {
        index,
        content: Arc::new(model),
        store: store.clone(),
        config: QueryConfig::default(),
    };
    (ctx, store)
}

/// Index client with scripted answers / 返回预设结果的索引客户端
#[derive(Default)]
pub struct FakeIndex {
    hang_submit: AtomicBool,
    hang_first: AtomicUsize,
    submit_calls: AtomicUsize,
    submitted: Mutex<Vec<i64>>,
    submit_error: Mutex<Option<IndexError>>,
    commit_error: Mutex<Option<IndexError>>,
    terms: Mutex<Vec<Term>>,
    terms_error: Mutex<Option<IndexError>>,
    query_results: Mutex<HashMap<String, std::result::Result<Vec<i64>, IndexError>>>,
    snippets: Mutex<HashMap<i64, String>>,
    snippet_error: Mutex<Option<IndexError>>,
    snippet_gate: Mutex<Option<Arc<Semaphore>>>,
    terms_requests: Mutex<Vec<TermsRequest>>,
    queries: Mutex<Vec<String>>,
    snippet_requests: Mutex<Vec<SnippetRequest>>,
    lifecycle: Mutex<Vec<&'static str>>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hang_submit(&self, hang: bool) {
        self.hang_submit.store(hang, Ordering::SeqCst);
    }

    /// Only the next `count` submissions hang / 仅接下来的 count 次提交挂起
    pub fn hang_first_submits(&self, count: usize) {
        self.hang_first.store(count, Ordering::SeqCst);
    }

    /// Submissions started, hung ones included / 已开始的提交次数（含挂起）
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Ids of documents accepted by submit / 已接受提交的文档 id
    pub fn submitted(&self) -> Vec<i64> {
        self.submitted.lock().clone()
    }

    pub fn fail_submit(&self, err: IndexError) {
        *self.submit_error.lock() = Some(err);
    }

    pub fn fail_commit(&self, err: IndexError) {
        *self.commit_error.lock() = Some(err);
    }

    pub fn set_terms(&self, terms: &[&str]) {
        *self.terms.lock() = terms
            .iter()
            .map(|t| Term { term: t.to_string(), frequency: 1 })
            .collect();
    }

    pub fn fail_terms(&self, err: IndexError) {
        *self.terms_error.lock() = Some(err);
    }

    pub fn set_query(&self, query: &str, ids: &[i64]) {
        self.query_results.lock().insert(query.to_string(), Ok(ids.to_vec()));
    }

    pub fn fail_query(&self, query: &str, err: IndexError) {
        self.query_results.lock().insert(query.to_string(), Err(err));
    }

    pub fn set_snippet(&self, content_id: i64, snippet: &str) {
        self.snippets.lock().insert(content_id, snippet.to_string());
    }

    pub fn fail_snippet(&self, err: IndexError) {
        *self.snippet_error.lock() = Some(err);
    }

    /// Every snippet call waits for a permit / 每次片段请求需获取许可
    pub fn set_snippet_gate(&self, gate: Arc<Semaphore>) {
        *self.snippet_gate.lock() = Some(gate);
    }

    pub fn terms_requests(&self) -> Vec<TermsRequest> {
        self.terms_requests.lock().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn snippet_requests(&self) -> Vec<SnippetRequest> {
        self.snippet_requests.lock().clone()
    }

    pub fn lifecycle_calls(&self) -> Vec<&'static str> {
        self.lifecycle.lock().clone()
    }

    fn record(&self, call: &'static str) {
        self.lifecycle.lock().push(call);
    }
}

#[async_trait]
impl IndexServiceClient for FakeIndex {
    async fn submit(&self, document: IndexDocument, _stream: ContentStream) -> std::result::Result<(), IndexError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let hang_once = self
            .hang_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hang_once || self.hang_submit.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.submit_error.lock().clone() {
            return Err(err);
        }
        self.submitted.lock().push(document.id);
        Ok(())
    }

    async fn commit(&self) -> std::result::Result<(), IndexError> {
        match self.commit_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn enumerate_terms(&self, request: &TermsRequest) -> std::result::Result<Vec<Term>, IndexError> {
        self.terms_requests.lock().push(request.clone());
        if let Some(err) = self.terms_error.lock().clone() {
            return Err(err);
        }
        Ok(self.terms.lock().clone())
    }

    async fn query(&self, query: &str, _rows: usize) -> std::result::Result<Vec<i64>, IndexError> {
        self.queries.lock().push(query.to_string());
        self.query_results
            .lock()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn snippet(&self, request: &SnippetRequest) -> std::result::Result<String, IndexError> {
        self.snippet_requests.lock().push(request.clone());
        let gate = self.snippet_gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.map_err(|e| IndexError::Request(e.to_string()))?;
        }
        if let Some(err) = self.snippet_error.lock().clone() {
            return Err(err);
        }
        Ok(self.snippets.lock().get(&request.content_id).cloned().unwrap_or_default())
    }

    async fn close_core(&self) -> std::result::Result<(), IndexError> {
        self.record("close_core");
        Ok(())
    }

    async fn stop(&self) -> std::result::Result<(), IndexError> {
        self.record("stop");
        Ok(())
    }

    async fn start(&self) -> std::result::Result<(), IndexError> {
        self.record("start");
        Ok(())
    }

    async fn open_core(&self) -> std::result::Result<(), IndexError> {
        self.record("open_core");
        Ok(())
    }
}

/// Store whose writes always fail / 写入总是失败的存储
pub struct FailingStore;

#[async_trait]
impl AnnotationStore for FailingStore {
    async fn create_artifact(&self, _content_id: i64, _artifact_type: ArtifactType) -> Result<Artifact> {
        Err(anyhow!("database is locked"))
    }

    async fn add_attributes(&self, _artifact_id: i64, _attributes: Vec<Attribute>) -> Result<()> {
        Err(anyhow!("database is locked"))
    }

    async fn remove_artifact(&self, _artifact_id: i64) -> Result<()> {
        Err(anyhow!("database is locked"))
    }

    async fn artifacts_for(&self, _content_id: i64) -> Result<Vec<Artifact>> {
        Ok(Vec::new())
    }
}

/// Store that creates artifacts but rejects their attributes / 可创建结果但拒绝写入属性的存储
#[derive(Default)]
pub struct AttributeRejectingStore {
    pub inner: MemoryBlackboard,
}

#[async_trait]
impl AnnotationStore for AttributeRejectingStore {
    async fn create_artifact(&self, content_id: i64, artifact_type: ArtifactType) -> Result<Artifact> {
        self.inner.create_artifact(content_id, artifact_type).await
    }

    async fn add_attributes(&self, _artifact_id: i64, _attributes: Vec<Attribute>) -> Result<()> {
        Err(anyhow!("attribute table is full"))
    }

    async fn remove_artifact(&self, artifact_id: i64) -> Result<()> {
        self.inner.remove_artifact(artifact_id).await
    }

    async fn artifacts_for(&self, content_id: i64) -> Result<Vec<Artifact>> {
        self.inner.artifacts_for(content_id).await
    }
}
