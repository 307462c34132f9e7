//! In-process annotation store / 进程内标注存储

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use super::{AnnotationStore, Artifact, ArtifactType, Attribute};

pub struct MemoryBlackboard {
    artifacts: RwLock<BTreeMap<i64, Artifact>>,
    next_id: AtomicI64,
}

impl Default for MemoryBlackboard {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlackboard {
    pub fn new() -> Self {
        Self {
            artifacts: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }

    /// All artifacts of one kind, in creation order / 某类型的全部结果
    pub fn artifacts_of_type(&self, artifact_type: ArtifactType) -> Vec<Artifact> {
        self.artifacts
            .read()
            .values()
            .filter(|a| a.artifact_type == artifact_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AnnotationStore for MemoryBlackboard {
    async fn create_artifact(&self, content_id: i64, artifact_type: ArtifactType) -> Result<Artifact> {
        let artifact = Artifact {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            artifact_type,
            content_id,
            attributes: Vec::new(),
        };
        self.artifacts.write().insert(artifact.id, artifact.clone());
        Ok(artifact)
    }

    async fn add_attributes(&self, artifact_id: i64, attributes: Vec<Attribute>) -> Result<()> {
        let mut artifacts = self.artifacts.write();
        let artifact = artifacts
            .get_mut(&artifact_id)
            .ok_or_else(|| anyhow!("Artifact {} not found", artifact_id))?;
        artifact.attributes.extend(attributes);
        Ok(())
    }

    async fn remove_artifact(&self, artifact_id: i64) -> Result<()> {
        self.artifacts
            .write()
            .remove(&artifact_id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Artifact {} not found", artifact_id))
    }

    async fn artifacts_for(&self, content_id: i64) -> Result<Vec<Artifact>> {
        Ok(self
            .artifacts
            .read()
            .values()
            .filter(|a| a.content_id == content_id)
            .cloned()
            .collect())
    }
}
