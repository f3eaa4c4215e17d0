use crate::command::{Command, MessageBody, Response};
use crate::context::DispatchContext;
use crate::mapper::ServiceIdentity;
use async_trait::async_trait;

/// 命令处理器：某一具体命令类型的终点业务逻辑
#[async_trait]
pub trait CommandHandler<B>: Send + Sync
where
    B: MessageBody,
{
    /// 处理器所属的目标服务（锁键派生按此选择映射）
    fn service(&self) -> ServiceIdentity;

    /// 处理命令；业务失败以 `anyhow::Error` 表达，由管线包装为 `HandlerFault`
    async fn handle(&self, ctx: &DispatchContext, cmd: Command<B>) -> anyhow::Result<Response>;
}
