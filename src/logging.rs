//! Tracing initialisation / 日志初始化

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber (RUST_LOG overrides the default filter) / 安装全局日志订阅器
///
/// Returns false if the host already installed one / 如果宿主已安装则返回 false
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Default filter for this crate / 默认过滤规则
pub const DEFAULT_FILTER: &str = "kwsearch=debug";
