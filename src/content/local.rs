//! Local directory content model / 本地目录内容模型
//!
//! Exposes a directory tree as one image with one file system / 将目录树暴露为单个镜像和单个文件系统
//! Ids are assigned in scan order starting at 1 / id 按扫描顺序从 1 开始分配

use async_trait::async_trait;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncRead;

use super::{ContentModel, ContentNode, FsContent, ImageInfo};

pub struct LocalContentModel {
    root: PathBuf,
    image: ImageInfo,
    files: HashMap<i64, FsContent>,
}

impl LocalContentModel {
    /// Scan a directory tree / 扫描目录树
    pub async fn scan(root: PathBuf, image: ImageInfo) -> Result<Self> {
        let mut files = HashMap::new();
        let mut pending = vec![root.clone()];
        let mut next_id = 1i64;

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            let mut children = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                children.push(entry);
            }
            // Deterministic ids / 保证 id 稳定
            children.sort_by_key(|entry| entry.file_name());

            for entry in children {
                let metadata = entry.metadata().await?;
                let full_path = entry.path();
                if metadata.is_dir() {
                    pending.push(full_path);
                    continue;
                }

                let content = FsContent {
                    id: next_id,
                    name: entry.file_name().to_string_lossy().to_string(),
                    path: Self::display_path(&root, &full_path),
                    size: metadata.len(),
                    mtime: unix_secs(metadata.modified().ok()),
                    ctime: change_time(&metadata),
                    atime: unix_secs(metadata.accessed().ok()),
                    crtime: unix_secs(metadata.created().ok()),
                    fs_id: image.id,
                };
                files.insert(next_id, content);
                next_id += 1;
            }
        }

        tracing::info!("Scanned {} files under {:?}", files.len(), root);
        Ok(Self { root, image, files })
    }

    /// Get root directory / 获取根目录
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// All scanned files, ordered by id / 按 id 排序的全部文件
    pub fn files(&self) -> Vec<FsContent> {
        let mut files: Vec<FsContent> = self.files.values().cloned().collect();
        files.sort_by_key(|f| f.id);
        files
    }

    fn display_path(root: &Path, full_path: &Path) -> String {
        let relative = full_path.strip_prefix(root).unwrap_or(full_path);
        let joined = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("/{}", joined)
    }
}

fn unix_secs(time: Option<SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn change_time(metadata: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ctime()
}

#[cfg(not(unix))]
fn change_time(metadata: &std::fs::Metadata) -> i64 {
    unix_secs(metadata.modified().ok())
}

#[async_trait]
impl ContentModel for LocalContentModel {
    async fn content_by_id(&self, id: i64) -> Result<Option<FsContent>> {
        Ok(self.files.get(&id).cloned())
    }

    async fn open_reader(&self, content: &FsContent) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        if !self.files.contains_key(&content.id) {
            return Err(anyhow!("Content {} is not part of {:?}", content.id, self.root));
        }
        let full_path = self.root.join(content.path.trim_start_matches('/'));
        let file = tokio::fs::File::open(&full_path).await?;
        Ok(Box::new(file))
    }

    fn parent_of(&self, node: ContentNode) -> Option<ContentNode> {
        match node {
            ContentNode::File(id) => self
                .files
                .get(&id)
                .map(|content| ContentNode::FileSystem(content.fs_id)),
            ContentNode::FileSystem(id) if id == self.image.id => Some(ContentNode::Image(id)),
            _ => None,
        }
    }

    fn image(&self, id: i64) -> Option<ImageInfo> {
        (id == self.image.id).then(|| self.image.clone())
    }
}
