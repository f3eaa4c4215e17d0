//! 管线行为（PipelineBehavior）
//!
//! 围绕每次分发执行的有序拦截器链。行为以类型擦除视图操作命令，
//! 通过 `Next` 恰好委派一次下游；`Next::run` 按值消费自身，重复委派无法通过编译。
//!
use crate::command::{AnyCommand, Response};
use crate::context::DispatchContext;
use crate::dispatcher::HandlerFn;
use crate::error::DispatchResult;
use crate::mapper::ServiceIdentity;
use async_trait::async_trait;
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 已路由命令（RoutedCommand）
///
/// 类型擦除的命令加上解析出的目标服务标识，在行为链中按值流动，
/// 最终由处理器终点消费还原。
pub struct RoutedCommand {
    command: Box<dyn AnyCommand>,
    target: ServiceIdentity,
}

impl RoutedCommand {
    pub(crate) fn new(command: Box<dyn AnyCommand>, target: ServiceIdentity) -> Self {
        Self { command, target }
    }

    /// 命令的类型擦除视图
    pub fn command(&self) -> &dyn AnyCommand {
        self.command.as_ref()
    }

    pub fn command_name(&self) -> &'static str {
        self.command.command_name()
    }

    pub fn payload_type(&self) -> TypeId {
        self.command.payload_type()
    }

    pub fn payload_name(&self) -> &str {
        self.command.payload_name()
    }

    /// 解析出的目标服务
    pub fn target(&self) -> ServiceIdentity {
        self.target
    }

    pub(crate) fn into_command(self) -> Box<dyn AnyCommand> {
        self.command
    }
}

/// 行为链后继（Next）
///
/// 持有剩余行为切片与处理器终点；`run` 消费自身，保证至多委派一次。
/// 上下文由链内部持有，行为无法替换，取消信号因此原样穿透。
pub struct Next<'a> {
    pub(crate) behaviors: &'a [Arc<dyn PipelineBehavior>],
    pub(crate) terminal: &'a HandlerFn,
    pub(crate) ctx: &'a DispatchContext,
    pub(crate) invoked: &'a AtomicBool,
}

impl<'a> Next<'a> {
    /// 进入链上的下一步：还有行为则进入下一个行为，否则进入处理器终点
    pub async fn run(self, cmd: RoutedCommand) -> DispatchResult<Response> {
        match self.behaviors.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    behaviors: rest,
                    terminal: self.terminal,
                    ctx: self.ctx,
                    invoked: self.invoked,
                };

                head.handle(self.ctx, cmd, next).await
            }
            None => {
                self.invoked.store(true, Ordering::SeqCst);

                (self.terminal)(cmd.into_command(), self.ctx).await
            }
        }
    }
}

/// 管线行为：围绕分发执行的拦截器
///
/// 实现方恰好调用一次 `next.run(cmd)` 并原样返回其结果；
/// 在委派之前产生的错误直接返回，处理器不会执行。
/// 遗漏委派会被分发器检出并报 `HandlerNotInvoked`。
#[async_trait]
pub trait PipelineBehavior: Send + Sync {
    async fn handle(
        &self,
        ctx: &DispatchContext,
        cmd: RoutedCommand,
        next: Next<'_>,
    ) -> DispatchResult<Response>;
}
