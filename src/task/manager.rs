use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::models::{WriterControl, WriterOutcome};
use super::types::{WriterEvent, WriterStatus};
use super::writer::{display_name, ResultWriter};
use crate::config::WriterConfig;
use crate::events::EventSink;
use crate::query::{KeywordQuery, MatchSet, SearchContext};

/// 已注册写入任务的取消句柄
#[derive(Default)]
struct WriterRegistry {
    writers: Mutex<HashMap<String, Arc<WriterControl>>>,
}

impl WriterRegistry {
    fn cancel_all(&self) -> usize {
        let mut writers = self.writers.lock();
        let count = writers.len();
        for control in writers.values() {
            control.cancel();
        }
        writers.clear();
        count
    }
}

/// 注册凭证，释放时注销写入任务
pub(super) struct Registration {
    registry: Arc<WriterRegistry>,
    writer_id: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.writers.lock().remove(&self.writer_id);
    }
}

struct SupervisorInner {
    registry: Arc<WriterRegistry>,
    event_sender: broadcast::Sender<WriterEvent>,
    ctx: SearchContext,
    sink: Arc<dyn EventSink>,
    config: WriterConfig,
}

impl Drop for SupervisorInner {
    fn drop(&mut self) {
        let cancelled = self.registry.cancel_all();
        if cancelled > 0 {
            tracing::info!("Session ended, cancelled {} result writers", cancelled);
        }
    }
}

/// 结果写入任务监管器（每个分析会话一个）
#[derive(Clone)]
pub struct WriterSupervisor {
    inner: Arc<SupervisorInner>,
}

/// 已启动写入任务的句柄
pub struct WriterHandle {
    id: String,
    control: Arc<WriterControl>,
    join: JoinHandle<WriterOutcome>,
}

impl WriterHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// 当前状态：Created → Running → Completed / Cancelled
    pub fn status(&self) -> WriterStatus {
        self.control.status()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// 等待任务结束
    pub async fn join(self) -> WriterOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Result writer {} did not finish: {}", self.id, e);
                self.control.set_status(WriterStatus::Cancelled);
                WriterOutcome {
                    writer_id: self.id,
                    status: WriterStatus::Cancelled,
                    artifacts: Vec::new(),
                    aborted: true,
                    notified: false,
                }
            }
        }
    }
}

impl WriterSupervisor {
    pub fn new(ctx: SearchContext, sink: Arc<dyn EventSink>, config: WriterConfig) -> Self {
        let (event_sender, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(SupervisorInner {
                registry: Arc::new(WriterRegistry::default()),
                event_sender,
                ctx,
                sink,
                config,
            }),
        }
    }

    pub fn context(&self) -> &SearchContext {
        &self.inner.ctx
    }

    /// 订阅写入进度事件
    pub fn subscribe(&self) -> broadcast::Receiver<WriterEvent> {
        self.inner.event_sender.subscribe()
    }

    /// 启动写入任务，启动前即完成注册
    pub fn spawn(&self, query: KeywordQuery, matches: MatchSet, list_name: Option<String>) -> WriterHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let control = Arc::new(WriterControl::new());
        self.inner
            .registry
            .writers
            .lock()
            .insert(id.clone(), control.clone());
        let registration = Registration {
            registry: self.inner.registry.clone(),
            writer_id: id.clone(),
        };

        let writer = ResultWriter {
            id: id.clone(),
            display_name: display_name(query.query_string(), self.inner.config.display_len),
            query,
            matches,
            list_name,
            ctx: self.inner.ctx.clone(),
            sink: self.inner.sink.clone(),
            control: control.clone(),
            events: self.inner.event_sender.clone(),
        };
        let join = tokio::spawn(writer.run(registration));

        WriterHandle { id, control, join }
    }

    /// 注册中的写入任务数量
    pub fn active_count(&self) -> usize {
        self.inner.registry.writers.lock().len()
    }

    pub fn is_registered(&self, writer_id: &str) -> bool {
        self.inner.registry.writers.lock().contains_key(writer_id)
    }

    /// 已注册写入任务的状态，注销后为 None
    pub fn status_of(&self, writer_id: &str) -> Option<WriterStatus> {
        self.inner.registry.writers.lock().get(writer_id).map(|control| control.status())
    }

    /// 取消并注销全部写入任务
    pub fn stop_all(&self) -> usize {
        let cancelled = self.inner.registry.cancel_all();
        tracing::info!("Stopped {} result writers", cancelled);
        cancelled
    }
}
