use bon::Builder;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// 分发上下文（DispatchContext）
///
/// 承载一次分发所需的横切信息，整条行为链与处理器共享同一份只读引用：
/// - `correlation_id`：调用方提供的关联追踪 ID（可选）；
/// - `issued_at`：命令签发时间；
/// - `cancellation`：取消信号，原样穿透所有行为到达处理器，行为无法拦截或替换。
///
/// 典型用法：
/// ```rust
/// use dispatch_core::context::DispatchContext;
///
/// let ctx = DispatchContext::builder()
///     .maybe_correlation_id(Some("cor-123".into()))
///     .build();
/// assert_eq!(ctx.correlation_id(), Some("cor-123"));
/// assert!(ctx.issued_at() <= chrono::Utc::now());
/// assert!(!ctx.cancellation().is_cancelled());
/// ```
#[derive(Builder, Clone, Debug)]
pub struct DispatchContext {
    /// 关联ID
    correlation_id: Option<String>,
    /// 签发时间
    #[builder(default = Utc::now())]
    issued_at: DateTime<Utc>,
    /// 取消信号（默认新建、未触发）
    #[builder(default)]
    cancellation: CancellationToken,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DispatchContext {
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
