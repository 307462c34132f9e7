//! In-memory content model / 内存内容模型

use async_trait::async_trait;
use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Cursor;
use tokio::io::AsyncRead;

use super::{ContentModel, ContentNode, FsContent, ImageInfo};

/// Content model holding registered items and their bytes / 保存已注册内容及其数据的内容模型
#[derive(Default)]
pub struct MemoryContentModel {
    files: RwLock<HashMap<i64, (FsContent, bytes::Bytes)>>,
    parents: RwLock<HashMap<ContentNode, ContentNode>>,
    images: RwLock<HashMap<i64, ImageInfo>>,
}

impl MemoryContentModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&self, image: ImageInfo) {
        self.images.write().insert(image.id, image);
    }

    /// Record a parent link in the ownership chain / 记录所属链中的父子关系
    pub fn link(&self, child: ContentNode, parent: ContentNode) {
        self.parents.write().insert(child, parent);
    }

    /// Register a file; its parent is its file system / 注册文件，父节点为其文件系统
    pub fn add_file(&self, content: FsContent, data: impl Into<bytes::Bytes>) {
        self.files.write().insert(content.id, (content, data.into()));
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[async_trait]
impl ContentModel for MemoryContentModel {
    async fn content_by_id(&self, id: i64) -> Result<Option<FsContent>> {
        Ok(self.files.read().get(&id).map(|(content, _)| content.clone()))
    }

    async fn open_reader(&self, content: &FsContent) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        let data = self
            .files
            .read()
            .get(&content.id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| anyhow!("Content {} not found", content.id))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn parent_of(&self, node: ContentNode) -> Option<ContentNode> {
        match node {
            ContentNode::File(id) => self
                .files
                .read()
                .get(&id)
                .map(|(content, _)| ContentNode::FileSystem(content.fs_id)),
            other => self.parents.read().get(&other).copied(),
        }
    }

    fn image(&self, id: i64) -> Option<ImageInfo> {
        self.images.read().get(&id).cloned()
    }
}
