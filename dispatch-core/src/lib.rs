//! 类型化命令分发内核（dispatch-core）
//!
//! 提供“一条命令 → 唯一处理器”的进程内分发构件，用于在应用中实现：
//! - 命令模型（`command`）：`MessageBody` 载荷、`Command<B>` 信封与类型擦除视图
//! - 键派生（`mapper`）：按（载荷类型, 目标服务）对派生 `LockKey` 与 `BehaviorModel`
//! - 行为链（`behavior`）：围绕每次分发的有序拦截器，最内层为处理器终点
//! - 分发器（`dispatcher`）：按命令具体类型解析唯一 `CommandHandler` 并经行为链调用
//!
//! 所有注册在组合根一次完成；此后注册表冻结只读，可在并发分发间安全共享。
//! 本 crate 不含队列、重试与跨进程投递：分发在进程内同步完成（处理器内部可 await）。
//!
//! 典型用法：
//! 1. 定义载荷类型并实现 `MessageBody`；
//! 2. 在 `MapperRegistry` 上为每个（载荷, 目标服务）对注册锁键派生、为载荷注册行为模型派生；
//! 3. 在 `Dispatcher` 上注册处理器与行为（如 `LoggingBehavior`），完成后以 `Arc` 冻结；
//! 4. 通过 `dispatch(ctx, command)` 提交命令并取回响应。
//!
pub mod behavior;
pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod logging_behavior;
pub mod mapper;

pub use dispatcher::Dispatcher;
pub use logging_behavior::LoggingBehavior;
pub use mapper::MapperRegistry;
