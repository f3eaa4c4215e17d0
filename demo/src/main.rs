use async_trait::async_trait;
use dispatch_core::command::{Command, MessageBody, Response};
use dispatch_core::context::DispatchContext;
use dispatch_core::handler::CommandHandler;
use dispatch_core::logging_behavior::TracingLog;
use dispatch_core::mapper::ServiceIdentity;
use dispatch_core::{Dispatcher, LoggingBehavior, MapperRegistry};
use std::sync::Arc;

#[derive(Debug)]
struct GetCustomerMessageBody {
    name: String,
}

impl MessageBody for GetCustomerMessageBody {
    const NAME: &'static str = "GetCustomerMessageBody";

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct DownloadCustomerMessageBody {
    name: String,
}

impl MessageBody for DownloadCustomerMessageBody {
    const NAME: &'static str = "DownloadCustomerMessageBody";

    fn name(&self) -> &str {
        &self.name
    }
}

const GET_CUSTOMER_SERVICE: ServiceIdentity = ServiceIdentity::new("GetCustomerService");
const DOWNLOAD_CUSTOMER_SERVICE: ServiceIdentity = ServiceIdentity::new("DownloadCustomerService");

struct GetCustomerHandler;

#[async_trait]
impl CommandHandler<GetCustomerMessageBody> for GetCustomerHandler {
    fn service(&self) -> ServiceIdentity {
        GET_CUSTOMER_SERVICE
    }

    async fn handle(
        &self,
        _ctx: &DispatchContext,
        _cmd: Command<GetCustomerMessageBody>,
    ) -> anyhow::Result<Response> {
        println!("Handled GetCustomerService");
        Ok(Response::empty())
    }
}

struct DownloadCustomerHandler;

#[async_trait]
impl CommandHandler<DownloadCustomerMessageBody> for DownloadCustomerHandler {
    fn service(&self) -> ServiceIdentity {
        DOWNLOAD_CUSTOMER_SERVICE
    }

    async fn handle(
        &self,
        _ctx: &DispatchContext,
        _cmd: Command<DownloadCustomerMessageBody>,
    ) -> anyhow::Result<Response> {
        println!("Handled DownloadCustomerService");
        Ok(Response::empty())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    // 组合根：注册键派生
    let mut mapper = MapperRegistry::new();
    mapper
        .register_lock_key::<GetCustomerMessageBody>(GET_CUSTOMER_SERVICE, " GetCustomerService")
        .unwrap();
    mapper
        .register_lock_key::<DownloadCustomerMessageBody>(
            DOWNLOAD_CUSTOMER_SERVICE,
            " DownloadCustomerService",
        )
        .unwrap();
    mapper
        .register_behavior_model::<GetCustomerMessageBody>(" Behavior")
        .unwrap();
    mapper
        .register_behavior_model::<DownloadCustomerMessageBody>(" Behavior")
        .unwrap();
    let mapper = Arc::new(mapper);

    // 注册处理器与日志行为，冻结后共享
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .register_handler::<GetCustomerMessageBody, _>(Arc::new(GetCustomerHandler))
        .unwrap();
    dispatcher
        .register_handler::<DownloadCustomerMessageBody, _>(Arc::new(DownloadCustomerHandler))
        .unwrap();
    dispatcher.register_behavior(Arc::new(LoggingBehavior::new(
        mapper.clone(),
        Arc::new(TracingLog),
    )));
    let dispatcher = Arc::new(dispatcher);

    let ctx = DispatchContext::builder()
        .maybe_correlation_id(Some("demo-1".into()))
        .build();

    // 查询客户
    dispatcher
        .dispatch(
            &ctx,
            Command::new(GetCustomerMessageBody {
                name: "Nam Le".into(),
            }),
        )
        .await
        .unwrap();

    // 下载客户
    dispatcher
        .dispatch(
            &ctx,
            Command::new(DownloadCustomerMessageBody {
                name: "Anh Le".into(),
            }),
        )
        .await
        .unwrap();

    println!("Hello World!");
}
