//! 分发器（Dispatcher）
//!
//! 基于内存注册表的命令分发实现
//! - 通过 TypeId 注册不同 `Command<B>` 对应的 Handler（重复注册立即报错）
//! - 运行时以类型擦除（Any）方式进行调度，经行为链到达处理器终点
//! - 注册使用 `&mut self`；分发只读，冻结进 `Arc` 后可并发共享
//!
use crate::behavior::{Next, PipelineBehavior, RoutedCommand};
use crate::command::{AnyCommand, Command, MessageBody, Response};
use crate::context::DispatchContext;
use crate::error::{DispatchError, DispatchResult};
use crate::handler::CommandHandler;
use crate::mapper::ServiceIdentity;
use std::any::{TypeId, type_name_of_val};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = DispatchResult<Response>> + Send + 'a>>;

pub(crate) type HandlerFn = Arc<
    dyn for<'a> Fn(Box<dyn AnyCommand>, &'a DispatchContext) -> HandlerFuture<'a> + Send + Sync,
>;

/// 处理器注册项：目标服务标识 + 类型擦除的调用闭包
struct HandlerEntry {
    service: ServiceIdentity,
    command: &'static str,
    call: HandlerFn,
}

pub struct Dispatcher {
    handlers: HashMap<TypeId, HandlerEntry>,
    behaviors: Vec<Arc<dyn PipelineBehavior>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            behaviors: Vec::new(),
        }
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令处理器（每个具体命令类型恰好一个）
    pub fn register_handler<B, H>(&mut self, handler: Arc<H>) -> DispatchResult<()>
    where
        B: MessageBody,
        H: CommandHandler<B> + 'static,
    {
        let key = TypeId::of::<Command<B>>();

        if self.handlers.contains_key(&key) {
            return Err(DispatchError::AmbiguousHandler { command: B::NAME });
        }

        let service = handler.service();

        let call: HandlerFn = {
            let handler = handler.clone();

            Arc::new(move |cmd, ctx| {
                let handler = handler.clone();

                Box::pin(async move {
                    // 正常情况下这里的 downcast 永远不会失败（键与闭包同一泛型 B）
                    match cmd.into_any().downcast::<Command<B>>() {
                        Ok(cmd) => match handler.handle(ctx, *cmd).await {
                            Ok(resp) => Ok(resp),
                            Err(fault) => Err(DispatchError::HandlerFault {
                                command: B::NAME,
                                fault,
                            }),
                        },
                        Err(e) => Err(DispatchError::TypeMismatch {
                            expected: B::NAME,
                            found: type_name_of_val(&e),
                        }),
                    }
                })
            })
        };

        self.handlers.insert(
            key,
            HandlerEntry {
                service,
                command: B::NAME,
                call,
            },
        );

        Ok(())
    }

    /// 注册管线行为：按注册顺序执行，先注册者在最外层
    pub fn register_behavior(&mut self, behavior: Arc<dyn PipelineBehavior>) {
        self.behaviors.push(behavior);
    }

    /// 已注册的命令类型名列表（只读视图）
    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.handlers.values().map(|e| e.command).collect()
    }

    /// 分发一条命令：解析唯一处理器，经行为链调用，返回其响应
    ///
    /// 行为链整体成功但处理器从未执行（某个行为遗漏了委派）时返回
    /// `HandlerNotInvoked`，使该缺陷在调用方可见。
    pub async fn dispatch<B>(
        &self,
        ctx: &DispatchContext,
        cmd: Command<B>,
    ) -> DispatchResult<Response>
    where
        B: MessageBody,
    {
        let Some(entry) = self.handlers.get(&TypeId::of::<Command<B>>()) else {
            return Err(DispatchError::NoHandlerRegistered { command: B::NAME });
        };

        let invoked = AtomicBool::new(false);
        let next = Next {
            behaviors: &self.behaviors,
            terminal: &entry.call,
            ctx,
            invoked: &invoked,
        };

        let response = next
            .run(RoutedCommand::new(Box::new(cmd), entry.service))
            .await?;

        if !invoked.load(Ordering::SeqCst) {
            return Err(DispatchError::HandlerNotInvoked { command: B::NAME });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::task::JoinSet;

    struct CustomerBody {
        name: String,
    }

    impl MessageBody for CustomerBody {
        const NAME: &'static str = "CustomerBody";

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct OrderBody {
        name: String,
    }

    impl MessageBody for OrderBody {
        const NAME: &'static str = "OrderBody";

        fn name(&self) -> &str {
            &self.name
        }
    }

    const GET_SERVICE: ServiceIdentity = ServiceIdentity::new("GetCustomerService");
    const ORDER_SERVICE: ServiceIdentity = ServiceIdentity::new("OrderService");

    struct SpyHandler {
        service: ServiceIdentity,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl<B: MessageBody> CommandHandler<B> for SpyHandler {
        fn service(&self) -> ServiceIdentity {
            self.service
        }

        async fn handle(
            &self,
            _ctx: &DispatchContext,
            _cmd: Command<B>,
        ) -> anyhow::Result<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::empty())
        }
    }

    fn customer(name: &str) -> Command<CustomerBody> {
        Command::new(CustomerBody { name: name.into() })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn register_and_dispatch_works() {
        let mut dispatcher = Dispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: calls.clone(),
            }))
            .unwrap();

        let ctx = DispatchContext::default();
        let resp = dispatcher.dispatch(&ctx, customer("Nam Le")).await.unwrap();

        assert!(resp.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn routes_by_exact_concrete_type() {
        // 两个载荷类型各自注册，分发只命中对应处理器
        let mut dispatcher = Dispatcher::new();
        let customer_calls = Arc::new(AtomicUsize::new(0));
        let order_calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: customer_calls.clone(),
            }))
            .unwrap();
        dispatcher
            .register_handler::<OrderBody, _>(Arc::new(SpyHandler {
                service: ORDER_SERVICE,
                calls: order_calls.clone(),
            }))
            .unwrap();

        let ctx = DispatchContext::default();
        dispatcher.dispatch(&ctx, customer("Nam Le")).await.unwrap();

        assert_eq!(customer_calls.load(Ordering::SeqCst), 1);
        assert_eq!(order_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_handler_error_when_unregistered() {
        let dispatcher = Dispatcher::new();
        let ctx = DispatchContext::default();

        let err = dispatcher
            .dispatch(&ctx, customer("Nam Le"))
            .await
            .unwrap_err();
        match err {
            DispatchError::NoHandlerRegistered { command } => assert_eq!(command, "CustomerBody"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duplicate_registration_is_ambiguous() {
        let mut dispatcher = Dispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: calls.clone(),
            }))
            .unwrap();

        let err = dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: calls.clone(),
            }))
            .unwrap_err();
        match err {
            DispatchError::AmbiguousHandler { command } => assert_eq!(command, "CustomerBody"),
            other => panic!("unexpected error: {other:?}"),
        }

        // 首次注册保持生效
        assert_eq!(dispatcher.registered_commands(), vec!["CustomerBody"]);
    }

    struct FailingHandler;

    #[async_trait]
    impl CommandHandler<CustomerBody> for FailingHandler {
        fn service(&self) -> ServiceIdentity {
            GET_SERVICE
        }

        async fn handle(
            &self,
            _ctx: &DispatchContext,
            _cmd: Command<CustomerBody>,
        ) -> anyhow::Result<Response> {
            Err(anyhow::anyhow!("boom"))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn handler_fault_wraps_business_error() {
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(FailingHandler))
            .unwrap();

        let ctx = DispatchContext::default();
        let err = dispatcher
            .dispatch(&ctx, customer("Nam Le"))
            .await
            .unwrap_err();
        match err {
            DispatchError::HandlerFault { command, fault } => {
                assert_eq!(command, "CustomerBody");
                assert_eq!(fault.to_string(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    struct ForgetfulBehavior;

    #[async_trait]
    impl PipelineBehavior for ForgetfulBehavior {
        async fn handle(
            &self,
            _ctx: &DispatchContext,
            _cmd: RoutedCommand,
            _next: Next<'_>,
        ) -> DispatchResult<Response> {
            // 故意不委派：模拟遗漏 next 的缺陷行为
            Ok(Response::empty())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn forgotten_delegation_is_observable() {
        let mut dispatcher = Dispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: calls.clone(),
            }))
            .unwrap();
        dispatcher.register_behavior(Arc::new(ForgetfulBehavior));

        let ctx = DispatchContext::default();
        let err = dispatcher
            .dispatch(&ctx, customer("Nam Le"))
            .await
            .unwrap_err();

        match err {
            DispatchError::HandlerNotInvoked { command } => assert_eq!(command, "CustomerBody"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    struct TagBehavior {
        tag: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl PipelineBehavior for TagBehavior {
        async fn handle(
            &self,
            _ctx: &DispatchContext,
            cmd: RoutedCommand,
            next: Next<'_>,
        ) -> DispatchResult<Response> {
            self.seen.lock().unwrap().push(self.tag);
            next.run(cmd).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn behaviors_run_in_registration_order() {
        let mut dispatcher = Dispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: calls.clone(),
            }))
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        dispatcher.register_behavior(Arc::new(TagBehavior {
            tag: "outer",
            seen: seen.clone(),
        }));
        dispatcher.register_behavior(Arc::new(TagBehavior {
            tag: "inner",
            seen: seen.clone(),
        }));

        let ctx = DispatchContext::default();
        dispatcher.dispatch(&ctx, customer("Nam Le")).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["outer", "inner"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct MetadataSpyBehavior {
        seen: Arc<Mutex<Vec<(String, String, String, bool)>>>,
    }

    #[async_trait]
    impl PipelineBehavior for MetadataSpyBehavior {
        async fn handle(
            &self,
            _ctx: &DispatchContext,
            cmd: RoutedCommand,
            next: Next<'_>,
        ) -> DispatchResult<Response> {
            self.seen.lock().unwrap().push((
                cmd.command_name().to_string(),
                cmd.payload_name().to_string(),
                cmd.target().to_string(),
                cmd.payload_type() == TypeId::of::<CustomerBody>(),
            ));
            next.run(cmd).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn routed_command_exposes_type_and_target_metadata() {
        let mut dispatcher = Dispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: calls.clone(),
            }))
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        dispatcher.register_behavior(Arc::new(MetadataSpyBehavior { seen: seen.clone() }));

        let ctx = DispatchContext::default();
        dispatcher.dispatch(&ctx, customer("Nam Le")).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(
                "CustomerBody".to_string(),
                "Nam Le".to_string(),
                "GetCustomerService".to_string(),
                true
            )]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn type_mismatch_error_when_entry_downcast_fails() {
        let mut dispatcher = Dispatcher::new();
        // 手动插入一个错误的条目：键是 Command<CustomerBody>，闭包却还原 Command<OrderBody>
        let call: HandlerFn = Arc::new(|cmd, _ctx| {
            Box::pin(async move {
                match cmd.into_any().downcast::<Command<OrderBody>>() {
                    Ok(_) => Ok(Response::empty()),
                    Err(e) => Err(DispatchError::TypeMismatch {
                        expected: OrderBody::NAME,
                        found: type_name_of_val(&e),
                    }),
                }
            })
        });
        dispatcher.handlers.insert(
            TypeId::of::<Command<CustomerBody>>(),
            HandlerEntry {
                service: GET_SERVICE,
                command: CustomerBody::NAME,
                call,
            },
        );

        let ctx = DispatchContext::default();
        let err = dispatcher
            .dispatch(&ctx, customer("Nam Le"))
            .await
            .unwrap_err();
        match err {
            DispatchError::TypeMismatch { expected, .. } => assert_eq!(expected, "OrderBody"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatch_is_safe() {
        let mut dispatcher = Dispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler::<CustomerBody, _>(Arc::new(SpyHandler {
                service: GET_SERVICE,
                calls: calls.clone(),
            }))
            .unwrap();
        let dispatcher = Arc::new(dispatcher);

        let mut set = JoinSet::new();
        let ctx = DispatchContext::default();
        for i in 0..100 {
            let dispatcher = dispatcher.clone();
            let ctx = ctx.clone();
            set.spawn(async move {
                dispatcher
                    .dispatch(&ctx, customer(&format!("c-{i}")))
                    .await
                    .unwrap()
            });
        }
        while let Some(res) = set.join_next().await {
            assert!(res.unwrap().is_empty());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 100);
    }
}
