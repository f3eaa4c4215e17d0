use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};

/// 消息载荷（MessageBody）
///
/// 在管线中流动的命令载荷契约，携带一个展示用名称。
/// - 载荷是键派生的输入：`LockKey` 与 `BehaviorModel` 均由 `name()` 拼接而来。
/// - 约定 `name()` 非空，但不做强制校验。
///
/// 关联常量：
/// - `NAME`：载荷类型的稳定名称，用于日志、错误与路由诊断。避免依赖 `type_name::<T>()`。
pub trait MessageBody: Send + Sync + 'static {
    /// 载荷类型的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 实例名称（键派生的拼接源）
    fn name(&self) -> &str;
}

/// 命令信封（Command）
///
/// 包裹一个具体载荷类型 `B` 的请求；`Command<B>` 的具体类型即分发键。
/// 一个实例恰好被 `dispatch` 消费一次。
#[derive(Debug)]
pub struct Command<B: MessageBody> {
    pub body: B,
}

impl<B: MessageBody> Command<B> {
    pub fn new(body: B) -> Self {
        Self { body }
    }
}

/// 处理器响应（Response）
///
/// 对管线不透明：可为空标记，也可携带任意 JSON 数据。
/// 由处理器构造，原样回传调用方，管线不保留。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    body: Option<serde_json::Value>,
}

impl Response {
    /// 空响应（仅表示执行成功）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_body(body: serde_json::Value) -> Self {
        Self { body: Some(body) }
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_none()
    }
}

/// 命令的类型擦除视图（AnyCommand）
///
/// 注册表与行为链以 trait 对象操作命令，同时保留运行时类型信息：
/// - `payload_type`：载荷的 `TypeId`，键派生注册表的查找键；
/// - `payload_any`：载荷的只读擦除视图，派生函数的输入；
/// - `into_any`：处理器终点还原具体 `Command<B>` 时使用。
pub trait AnyCommand: Send {
    /// 命令类型的稳定名称（即载荷的 [`MessageBody::NAME`]）
    fn command_name(&self) -> &'static str;

    /// 载荷的运行时类型标识
    fn payload_type(&self) -> TypeId;

    /// 载荷的实例名称
    fn payload_name(&self) -> &str;

    /// 载荷的只读擦除视图
    fn payload_any(&self) -> &dyn Any;

    /// 还原为可 downcast 的所有权形式
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<B: MessageBody> AnyCommand for Command<B> {
    fn command_name(&self) -> &'static str {
        B::NAME
    }

    fn payload_type(&self) -> TypeId {
        TypeId::of::<B>()
    }

    fn payload_name(&self) -> &str {
        self.body.name()
    }

    fn payload_any(&self) -> &dyn Any {
        &self.body
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
