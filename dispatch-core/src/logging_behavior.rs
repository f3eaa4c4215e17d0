//! 日志行为（LoggingBehavior）
//!
//! 内置的管线行为：在处理器执行前派生锁键与行为模型，向日志汇写入一条
//! 结构化记录（命令类型名 / 锁键名 / 行为模型名），随后原样委派下游。
//! 任一派生失败即中止本次分发，处理器不会执行。
//!
use crate::behavior::{Next, PipelineBehavior, RoutedCommand};
use crate::command::Response;
use crate::context::DispatchContext;
use crate::error::DispatchResult;
use crate::mapper::MapperRegistry;
use async_trait::async_trait;
use std::sync::Arc;

/// 分发日志汇（DispatchLog）
///
/// 结构化日志协作方：每次分发在处理器执行前恰好接收一条记录。
/// 如何落盘/上报由实现方决定，管线不关心。
pub trait DispatchLog: Send + Sync {
    fn record(&self, command: &str, lock_key: &str, behavior: &str);
}

/// 基于 tracing 的默认日志汇
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl DispatchLog for TracingLog {
    fn record(&self, command: &str, lock_key: &str, behavior: &str) {
        tracing::info!(command, lock_key, behavior, "dispatching command");
    }
}

/// 日志行为：派生 → 记录 → 委派
pub struct LoggingBehavior {
    mapper: Arc<MapperRegistry>,
    log: Arc<dyn DispatchLog>,
}

impl LoggingBehavior {
    pub fn new(mapper: Arc<MapperRegistry>, log: Arc<dyn DispatchLog>) -> Self {
        Self { mapper, log }
    }
}

#[async_trait]
impl PipelineBehavior for LoggingBehavior {
    async fn handle(
        &self,
        _ctx: &DispatchContext,
        cmd: RoutedCommand,
        next: Next<'_>,
    ) -> DispatchResult<Response> {
        let lock_key = self.mapper.lock_key(cmd.command(), cmd.target())?;
        let behavior = self.mapper.behavior_model(cmd.command())?;

        self.log
            .record(cmd.command_name(), lock_key.name(), behavior.name());

        next.run(cmd).await
    }
}
