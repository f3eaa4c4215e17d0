//! 分发管线统一错误定义
//!
//! 聚焦键派生缺失、处理器解析与业务故障的最小必要集合。
//! 注册期可见的配置错误（重复注册）在注册时立即返回；
//! 运行期错误在本次分发内快速失败，不影响其他分发。
//!
use thiserror::Error;

/// 统一错误类型（分发内核最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    // --- 键派生 ---
    #[error("unmapped payload type: payload={payload}, target={target:?}")]
    UnmappedType {
        payload: &'static str,
        target: Option<&'static str>,
    },
    #[error("mapping already registered: payload={payload}, target={target:?}")]
    AlreadyMapped {
        payload: &'static str,
        target: Option<&'static str>,
    },

    // --- 处理器解析 ---
    #[error("no handler registered: command={command}")]
    NoHandlerRegistered { command: &'static str },
    #[error("ambiguous handler registration: command={command}")]
    AmbiguousHandler { command: &'static str },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 执行 ---
    #[error("handler fault: command={command}, reason={fault}")]
    HandlerFault {
        command: &'static str,
        fault: anyhow::Error,
    },
    #[error("handler not invoked: command={command}")]
    HandlerNotInvoked { command: &'static str },
}

/// 统一 Result 类型别名
pub type DispatchResult<T> = Result<T, DispatchError>;
