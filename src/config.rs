//! Keyword search configuration module / 关键字搜索配置模块
//!
//! Configuration is loaded from a JSON file
//! Creates default config file on first run / 首次运行时创建默认配置文件

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::KeywordSearchError;
use crate::lists::KeywordList;

/// Keyword search configuration / 关键字搜索配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordSearchConfig {
    /// Index server configuration / 索引服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// Query configuration / 查询配置
    #[serde(default)]
    pub query: QueryConfig,
    /// Result writer configuration / 结果写入配置
    #[serde(default)]
    pub writer: WriterConfig,
    /// Keyword lists / 关键字列表
    #[serde(default)]
    pub lists: Vec<KeywordList>,
}

/// Index server configuration / 索引服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Solr base URL / Solr 地址
    pub url: String,
    /// Core name / 核心名称
    pub core: String,
    /// Read-side request timeout (seconds) / 请求超时
    pub request_timeout_secs: u64,
    /// Command used to stop the service during hard recovery / 停止服务命令
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_command: Option<String>,
    /// Command used to start the service during hard recovery / 启动服务命令
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
    /// How long to wait for the core to come back (seconds) / 等待核心恢复的时间
    pub startup_wait_secs: u64,
}

/// Query configuration / 查询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Field analyzed with the white-space tokenizer only / 仅空白分词的字段
    pub terms_field: String,
    /// Time allowance for term enumeration (seconds) / 词项枚举时间限制
    pub terms_time_allowed_secs: u64,
    /// Snippet fragment size (characters) / 片段长度
    pub snippet_fragment_size: usize,
    /// Highlight prefix marker / 高亮前缀
    pub highlight_pre: String,
    /// Highlight suffix marker / 高亮后缀
    pub highlight_post: String,
    /// Maximum rows per field query / 最大返回行数
    pub max_rows: usize,
}

/// Result writer configuration / 结果写入配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Query characters shown in progress display / 进度显示的查询长度
    pub display_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:23232/solr".to_string(),
            core: "coreCase".to_string(),
            request_timeout_secs: 30,
            stop_command: None,
            start_command: None,
            startup_wait_secs: 10,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            terms_field: "content_ws".to_string(),
            terms_time_allowed_secs: 90,
            snippet_fragment_size: 100,
            highlight_pre: "«".to_string(),
            highlight_post: "»".to_string(),
            max_rows: 1_000_000,
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { display_len: 40 }
    }
}

impl KeywordSearchConfig {
    /// Reject settings no query could run with / 拒绝无法执行查询的配置
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.server.url.trim().is_empty() || self.server.core.trim().is_empty() {
            return Err(KeywordSearchError::Config("server url and core must be set".to_string()));
        }
        if self.query.terms_field.trim().is_empty() {
            return Err(KeywordSearchError::Config("query.terms_field must be set".to_string()));
        }
        if self.query.max_rows == 0 {
            return Err(KeywordSearchError::Config("query.max_rows must be positive".to_string()));
        }
        if self.writer.display_len == 0 {
            return Err(KeywordSearchError::Config("writer.display_len must be positive".to_string()));
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Get the core URL / 获取核心地址
    pub fn core_url(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.core)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl QueryConfig {
    pub fn terms_time_allowed(&self) -> Duration {
        Duration::from_secs(self.terms_time_allowed_secs)
    }
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(path: &Path) -> Result<KeywordSearchConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: KeywordSearchConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {:?}", path))?;

        tracing::info!("Loaded keyword search configuration from {:?}", path);
        Ok(config)
    } else {
        let config = KeywordSearchConfig::default();
        save_config(path, &config)?;
        tracing::info!("Created default keyword search configuration at {:?}", path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(path: &Path, config: &KeywordSearchConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)
        .context("Failed to serialize config")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file {:?}", path))?;

    Ok(())
}
