use std::sync::Arc;
use chrono::Utc;
use tokio::sync::broadcast;

use super::manager::Registration;
use super::models::{WriterControl, WriterOutcome, WriterSummary};
use super::types::{WriterEvent, WriterStatus};
use crate::blackboard::ArtifactType;
use crate::events::{EventSink, ServiceDataEvent};
use crate::query::{KeywordQuery, MatchSet, SearchContext};
use crate::MODULE_NAME;

/// 进度显示名称，过长的查询会被截断
pub fn display_name(query: &str, display_len: usize) -> String {
    let shown = if query.chars().count() > display_len {
        let head: String = query.chars().take(display_len.saturating_sub(1)).collect();
        format!("{} ...", head)
    } else {
        query.to_string()
    };
    format!("Saving results: {}", shown)
}

/// 结果写入任务：把一次查询的命中逐个写入标注存储
pub struct ResultWriter {
    pub(super) id: String,
    pub(super) query: KeywordQuery,
    pub(super) matches: MatchSet,
    pub(super) list_name: Option<String>,
    pub(super) ctx: SearchContext,
    pub(super) sink: Arc<dyn EventSink>,
    pub(super) control: Arc<WriterControl>,
    pub(super) events: broadcast::Sender<WriterEvent>,
    pub(super) display_name: String,
}

impl ResultWriter {
    fn broadcast(&self, event: WriterEvent) {
        let _ = self.events.send(event);
    }

    /// 执行写入，注册在 `registration` 释放时注销
    pub(super) async fn run(self, registration: Registration) -> WriterOutcome {
        let created_at = Utc::now();
        self.control.set_status(WriterStatus::Running);
        let total_terms = self.matches.len();
        let total_hits = self.matches.hit_count();
        tracing::info!("{} started, {} terms, {} hits", self.display_name, total_terms, total_hits);
        self.broadcast(WriterEvent::WriterStarted {
            writer_id: self.id.clone(),
            display_name: self.display_name.clone(),
            total_terms,
            total_hits,
        });

        let mut artifacts = Vec::new();
        let mut aborted = false;
        let mut processed_terms = 0;

        'terms: for (term, items) in self.matches.iter() {
            processed_terms += 1;
            self.broadcast(WriterEvent::WriterProgress {
                writer_id: self.id.clone(),
                term: term.to_string(),
                processed_terms,
                total_terms,
            });

            for content in items {
                if self.control.is_cancelled() {
                    break 'terms;
                }
                match self
                    .query
                    .write_to_blackboard(&self.ctx, term, content, self.list_name.as_deref())
                    .await
                {
                    Ok(Some(written)) => artifacts.push(written.artifact),
                    Ok(None) => {}
                    Err(e) if e.is_index_unavailable() => {
                        tracing::warn!("{}: index unavailable, stopping: {}", self.display_name, e);
                        aborted = true;
                        break 'terms;
                    }
                    Err(e) => {
                        tracing::warn!("{}: error writing hit of '{}' in {}: {}", self.display_name, term, content.id, e);
                    }
                }
            }
        }

        let cancelled = self.control.is_cancelled();
        let status = if cancelled { WriterStatus::Cancelled } else { WriterStatus::Completed };
        self.control.set_status(status);
        drop(registration);

        let notified = !cancelled && !artifacts.is_empty();
        if notified {
            self.sink.fire(ServiceDataEvent {
                module: MODULE_NAME.to_string(),
                artifact_type: ArtifactType::KeywordHit,
                artifacts: artifacts.clone(),
            });
        }

        if cancelled {
            tracing::info!("{} cancelled after {} artifacts", self.display_name, artifacts.len());
        } else {
            tracing::info!("{} finished, {} artifacts", self.display_name, artifacts.len());
        }

        self.broadcast(WriterEvent::WriterFinished {
            summary: WriterSummary {
                writer_id: self.id.clone(),
                display_name: self.display_name.clone(),
                status,
                total_terms,
                processed_terms,
                artifact_count: artifacts.len(),
                aborted,
                created_at,
                finished_at: Some(Utc::now()),
            },
        });

        WriterOutcome {
            writer_id: self.id,
            status,
            artifacts,
            aborted,
            notified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("maytag", 40), "Saving results: maytag");

        let exact = "a".repeat(40);
        assert_eq!(display_name(&exact, 40), format!("Saving results: {}", exact));

        let long = "b".repeat(41);
        assert_eq!(display_name(&long, 40), format!("Saving results: {} ...", "b".repeat(39)));
    }
}
