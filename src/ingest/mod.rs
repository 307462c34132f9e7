//! Content ingest - submit files to the index service / 内容索引提交
//!
//! - One submission in flight at a time, through a single-slot worker / 单工作者串行提交
//! - Size-scaled timeout per submission / 按大小分级的超时
//! - Timeout triggers a hard restart of the index service / 超时触发索引服务硬重启
//! - Uncommitted work is committed by `finish` or reported on drop / 未提交的工作由 finish 提交，否则在释放时告警

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::content::{extract_strings, ContentModel, FsContent};
use crate::error::{IndexError, KeywordSearchError, Result};
use crate::search::{ContentStream, IndexDocument, IndexServiceClient};

pub mod filter;

pub use filter::{is_ingestible, INGESTIBLE_EXTENSIONS};

const MB: u64 = 1024 * 1024;

/// Submission timeout for a content size / 按内容大小计算提交超时
pub fn timeout_for(size: u64) -> Duration {
    let secs = if size < MB {
        60
    } else if size < 10 * MB {
        1200
    } else if size < 100 * MB {
        3600
    } else {
        10800
    };
    Duration::from_secs(secs)
}

/// What is sent for a content item / 提交的内容形式
#[derive(Debug, Clone)]
pub enum IngestStream {
    /// Raw file bytes, extracted by the service / 原始文件字节
    File,
    /// Printable strings already extracted from the file / 已抽取的可打印字符串
    Strings(String),
}

struct SubmitJob {
    document: IndexDocument,
    stream: ContentStream,
    reply: oneshot::Sender<std::result::Result<(), IndexError>>,
}

/// Single-slot submission worker / 单槽提交工作者
///
/// A submission whose caller has given up is dropped, so a timed-out item
/// never blocks the ones queued behind it / 调用方放弃的提交会被丢弃，不阻塞后续排队项
struct SubmitWorker {
    sender: mpsc::Sender<SubmitJob>,
    handle: JoinHandle<()>,
}

impl SubmitWorker {
    fn spawn(index: Arc<dyn IndexServiceClient>, restart: Arc<tokio::sync::Mutex<u64>>) -> Self {
        let (sender, mut receiver) = mpsc::channel::<SubmitJob>(1);
        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let SubmitJob { document, stream, mut reply } = job;
                if reply.is_closed() {
                    continue;
                }
                // Waits out a running restart / 等待进行中的重启结束
                drop(restart.lock().await);

                let id = document.id;
                let result = tokio::select! {
                    result = index.submit(document, stream) => result,
                    _ = reply.closed() => {
                        tracing::debug!("Submission of content {} abandoned by its caller", id);
                        continue;
                    }
                };
                // The caller may have given up already / 调用方可能已超时放弃
                let _ = reply.send(result);
            }
        });
        Self { sender, handle }
    }
}

impl Drop for SubmitWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Content submitter / 内容提交器
pub struct Ingester {
    index: Arc<dyn IndexServiceClient>,
    content: Arc<dyn ContentModel>,
    worker: SubmitWorker,
    /// Restart generation, held while restarting / 重启代数，重启期间持有
    restart: Arc<tokio::sync::Mutex<u64>>,
    uncommitted: AtomicBool,
}

impl Ingester {
    pub fn new(index: Arc<dyn IndexServiceClient>, content: Arc<dyn ContentModel>) -> Self {
        let restart = Arc::new(tokio::sync::Mutex::new(0));
        let worker = SubmitWorker::spawn(index.clone(), restart.clone());
        Self {
            index,
            content,
            worker,
            restart,
            uncommitted: AtomicBool::new(false),
        }
    }

    /// Whether documents were submitted since the last successful commit / 自上次提交后是否有新文档
    pub fn is_uncommitted(&self) -> bool {
        self.uncommitted.load(Ordering::SeqCst)
    }

    /// Number of hard restarts performed / 已执行的硬重启次数
    pub async fn restart_count(&self) -> u64 {
        *self.restart.lock().await
    }

    /// Submit a content item (not committed) / 提交内容项（不提交事务）
    ///
    /// The timeout follows the item's size whatever is sent / 超时按内容项大小计算，与提交形式无关
    pub async fn ingest(&self, content: &FsContent, stream: IngestStream) -> Result<()> {
        let reader: ContentStream = match stream {
            IngestStream::File => self.content.open_reader(content).await.map_err(|e| {
                KeywordSearchError::Ingestion {
                    id: content.id,
                    name: content.name.clone(),
                    source: IndexError::Content(e.to_string()),
                }
            })?,
            IngestStream::Strings(text) => Box::new(Cursor::new(text.into_bytes())),
        };

        self.submit(IndexDocument::from_content(content), reader, content.size).await
    }

    /// Submit a file as-is when the extractor handles it, its printable strings otherwise / 可抽取则提交原文件，否则提交可打印字符串
    pub async fn ingest_content(&self, content: &FsContent) -> Result<()> {
        if is_ingestible(&content.name) {
            return self.ingest(content, IngestStream::File).await;
        }

        let mut data = Vec::new();
        let mut reader = self.content.open_reader(content).await.map_err(|e| {
            KeywordSearchError::Ingestion {
                id: content.id,
                name: content.name.clone(),
                source: IndexError::Content(e.to_string()),
            }
        })?;
        reader.read_to_end(&mut data).await.map_err(|e| KeywordSearchError::Ingestion {
            id: content.id,
            name: content.name.clone(),
            source: IndexError::Content(e.to_string()),
        })?;

        let text = extract_strings(&data, crate::content::strings::DEFAULT_MIN_LEN);
        self.ingest(content, IngestStream::Strings(text)).await
    }

    async fn submit(&self, document: IndexDocument, stream: ContentStream, size: u64) -> Result<()> {
        let id = document.id;
        let name = document.file_name.clone();
        // Waits here while a restart is running / 重启期间在此等待
        let generation = *self.restart.lock().await;
        let sender = self.worker.sender.clone();

        let (reply, response) = oneshot::channel();
        let job = SubmitJob { document, stream, reply };

        let limit = timeout_for(size);
        let outcome = tokio::time::timeout(limit, async move {
            sender
                .send(job)
                .await
                .map_err(|_| IndexError::Request("Submission worker stopped".to_string()))?;
            response
                .await
                .map_err(|_| IndexError::Request("Submission worker dropped the request".to_string()))?
        })
        .await;

        match outcome {
            Ok(Ok(())) => {
                self.uncommitted.store(true, Ordering::SeqCst);
                tracing::debug!("Submitted content {} ({}) to index", id, name);
                Ok(())
            }
            Ok(Err(source)) => {
                tracing::warn!("Error ingesting content {} ({}): {}", id, name, source);
                Err(KeywordSearchError::Ingestion { id, name, source })
            }
            Err(_) => {
                tracing::warn!("Index request for content {} ({}) exceeded {:?}, restarting index service", id, name, limit);
                self.hard_restart(generation).await;
                Err(KeywordSearchError::Timeout { id, name })
            }
        }
    }

    /// Restart the index service once per timed-out generation / 每代超时只重启一次
    async fn hard_restart(&self, generation: u64) {
        let mut current = self.restart.lock().await;
        if *current != generation {
            tracing::debug!("Index service already restarted by a concurrent ingest");
            return;
        }

        // The stuck submission was dropped by the worker when its caller gave up / 卡住的提交已由工作者丢弃
        if let Err(e) = self.index.restart().await {
            tracing::warn!("Cannot restart index service: {}", e);
        } else {
            tracing::info!("Index service restarted");
        }
        *current += 1;
    }

    /// Flush submitted documents, best effort / 提交事务（尽力而为）
    pub async fn commit(&self) {
        match self.index.commit().await {
            Ok(()) => {
                self.uncommitted.store(false, Ordering::SeqCst);
                tracing::debug!("Index committed");
            }
            Err(e) => {
                let err = KeywordSearchError::Commit(e);
                tracing::warn!("{}", err);
            }
        }
    }

    /// Commit and release the ingester / 提交并释放
    pub async fn finish(self) {
        if self.is_uncommitted() {
            self.commit().await;
        }
    }
}

impl Drop for Ingester {
    fn drop(&mut self) {
        if self.is_uncommitted() {
            tracing::warn!("Ingester released with uncommitted documents, call finish() before dropping it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentModel;
    use crate::search::MemoryIndex;
    use crate::test_support::{sample_file, FakeIndex};

    const KB: u64 = 1024;

    #[test]
    fn test_timeout_tiers() {
        assert_eq!(timeout_for(0), Duration::from_secs(60));
        assert_eq!(timeout_for(500 * KB), Duration::from_secs(60));
        assert_eq!(timeout_for(MB - 1), Duration::from_secs(60));
        assert_eq!(timeout_for(MB), Duration::from_secs(1200));
        assert_eq!(timeout_for(10 * MB - 1), Duration::from_secs(1200));
        assert_eq!(timeout_for(10 * MB), Duration::from_secs(3600));
        assert_eq!(timeout_for(50 * MB), Duration::from_secs(3600));
        assert_eq!(timeout_for(100 * MB - 1), Duration::from_secs(3600));
        assert_eq!(timeout_for(100 * MB), Duration::from_secs(10800));
        assert_eq!(timeout_for(u64::MAX), Duration::from_secs(10800));
    }

    fn model_with(files: &[(FsContent, &str)]) -> Arc<MemoryContentModel> {
        let model = MemoryContentModel::new();
        for (content, text) in files {
            model.add_file(content.clone(), text.as_bytes().to_vec());
        }
        Arc::new(model)
    }

    #[tokio::test]
    async fn test_ingest_then_commit() {
        let index = Arc::new(MemoryIndex::default());
        let file = sample_file(1, "notes.txt", 100);
        let model = model_with(&[(file.clone(), "the maytag dryer")]);
        let ingester = Ingester::new(index.clone(), model);

        assert!(!ingester.is_uncommitted());
        ingester.ingest(&file, IngestStream::File).await.unwrap();
        assert!(ingester.is_uncommitted());
        assert!(index.query("maytag", 10).await.unwrap().is_empty());

        ingester.commit().await;
        assert!(!ingester.is_uncommitted());
        assert_eq!(index.query("maytag", 10).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_finish_commits() {
        let index = Arc::new(MemoryIndex::default());
        let file = sample_file(3, "a.log", 10);
        let ingester = Ingester::new(index.clone(), model_with(&[(file.clone(), "washer")]));
        ingester.ingest(&file, IngestStream::File).await.unwrap();
        ingester.finish().await;
        assert_eq!(index.query("washer", 10).await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_flag() {
        let index = Arc::new(FakeIndex::new());
        index.fail_commit(IndexError::Request("disk full".into()));
        let file = sample_file(1, "a.txt", 10);
        let ingester = Ingester::new(index.clone(), model_with(&[(file.clone(), "x")]));

        ingester.ingest(&file, IngestStream::File).await.unwrap();
        ingester.commit().await;
        assert!(ingester.is_uncommitted());
    }

    #[tokio::test]
    async fn test_submission_failure_is_ingestion_error() {
        let index = Arc::new(FakeIndex::new());
        index.fail_submit(IndexError::Content("corrupt".into()));
        let file = sample_file(7, "bad.pdf", 10);
        let ingester = Ingester::new(index.clone(), model_with(&[(file.clone(), "x")]));

        let err = ingester.ingest(&file, IngestStream::File).await.unwrap_err();
        assert!(matches!(err, KeywordSearchError::Ingestion { id: 7, .. }));
        assert!(!ingester.is_uncommitted());
        assert!(index.lifecycle_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_restarts_once() {
        let index = Arc::new(FakeIndex::new());
        index.hang_submit(true);
        let file = sample_file(9, "big.pst", 50 * MB);
        let ingester = Ingester::new(index.clone(), model_with(&[(file.clone(), "x")]));

        let started = tokio::time::Instant::now();
        let err = ingester.ingest(&file, IngestStream::File).await.unwrap_err();
        assert!(matches!(err, KeywordSearchError::Timeout { id: 9, .. }));
        assert!(started.elapsed() >= Duration::from_secs(3600));
        assert_eq!(index.lifecycle_calls(), vec!["close_core", "stop", "start", "open_core"]);
        assert_eq!(ingester.restart_count().await, 1);
        assert!(!ingester.is_uncommitted());

        // Items after the recovery are unaffected / 恢复后的其他文件不受影响
        index.hang_submit(false);
        let small = sample_file(10, "small.txt", 10);
        ingester.ingest(&small, IngestStream::Strings("ok".into())).await.unwrap();
        assert!(ingester.is_uncommitted());
        ingester.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_strings_timeout_follows_item_size() {
        let index = Arc::new(FakeIndex::new());
        index.hang_submit(true);
        let file = sample_file(9, "big.bin", 50 * MB);
        let model = MemoryContentModel::new();
        model.add_file(file.clone(), b"\x00\x01maytag\x02".to_vec());
        let ingester = Ingester::new(index.clone(), Arc::new(model));

        let started = tokio::time::Instant::now();
        let err = ingester.ingest_content(&file).await.unwrap_err();
        assert!(matches!(err, KeywordSearchError::Timeout { id: 9, .. }));
        assert!(started.elapsed() >= Duration::from_secs(3600));
        assert_eq!(ingester.restart_count().await, 1);
    }

    async fn wait_for_submits(index: &FakeIndex, count: usize) {
        while index.submit_calls() < count {
            tokio::task::yield_now().await;
        }
    }

    fn spawn_ingest(ingester: &Arc<Ingester>, file: &FsContent) -> JoinHandle<Result<()>> {
        let ingester = ingester.clone();
        let file = file.clone();
        tokio::spawn(async move { ingester.ingest(&file, IngestStream::File).await })
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_item_survives_restart() {
        let index = Arc::new(FakeIndex::new());
        index.hang_first_submits(1);
        let stuck = sample_file(1, "a.txt", 10);
        let queued = sample_file(2, "b.txt", 5 * MB);
        let model = model_with(&[(stuck.clone(), "x"), (queued.clone(), "y")]);
        let ingester = Arc::new(Ingester::new(index.clone(), model));

        let first = spawn_ingest(&ingester, &stuck);
        wait_for_submits(&index, 1).await;
        let second = spawn_ingest(&ingester, &queued);

        let err = first.await.unwrap().unwrap_err();
        assert!(matches!(err, KeywordSearchError::Timeout { id: 1, .. }));
        second.await.unwrap().unwrap();

        assert_eq!(index.submitted(), vec![2]);
        assert_eq!(index.lifecycle_calls(), vec!["close_core", "stop", "start", "open_core"]);
        assert_eq!(ingester.restart_count().await, 1);
        assert!(ingester.is_uncommitted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_timeouts_restart_once() {
        let index = Arc::new(FakeIndex::new());
        index.hang_submit(true);
        let files: Vec<_> = (1..=2).map(|id| sample_file(id, "f.txt", 10)).collect();
        let model = model_with(&[(files[0].clone(), "x"), (files[1].clone(), "y")]);
        let ingester = Arc::new(Ingester::new(index.clone(), model));

        let first = spawn_ingest(&ingester, &files[0]);
        wait_for_submits(&index, 1).await;
        let second = spawn_ingest(&ingester, &files[1]);

        for handle in [first, second] {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, KeywordSearchError::Timeout { .. }));
        }
        assert_eq!(index.lifecycle_calls(), vec!["close_core", "stop", "start", "open_core"]);
        assert_eq!(ingester.restart_count().await, 1);

        // Later items go through / 之后的条目正常提交
        index.hang_submit(false);
        let later = sample_file(3, "later.txt", 10);
        ingester.ingest(&later, IngestStream::Strings("ok".into())).await.unwrap();
        assert_eq!(index.submitted(), vec![3]);
        assert_eq!(ingester.restart_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_type_sends_strings() {
        let index = Arc::new(MemoryIndex::default());
        let file = sample_file(4, "blob.bin", 32);
        let model = MemoryContentModel::new();
        model.add_file(file.clone(), b"\x00\x01maytag\x02\x03ab\x00".to_vec());
        let ingester = Ingester::new(index.clone(), Arc::new(model));

        ingester.ingest_content(&file).await.unwrap();
        ingester.finish().await;
        assert_eq!(index.query("maytag", 10).await.unwrap(), vec![4]);
        assert!(index.query("ab", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_content_is_ingestion_error() {
        let index = Arc::new(MemoryIndex::default());
        let ingester = Ingester::new(index, Arc::new(MemoryContentModel::new()));
        let err = ingester
            .ingest(&sample_file(5, "gone.txt", 1), IngestStream::File)
            .await
            .unwrap_err();
        assert!(matches!(err, KeywordSearchError::Ingestion { id: 5, .. }));
    }
}
