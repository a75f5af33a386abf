use {
	order_server::{config, consts::GRACEFUL_TASKS_WAIT_SECS, consumer, graceful, init, server},
	std::{net::SocketAddr, process::ExitCode, time::Duration},
	tracing::{error, info, warn},
};

#[tokio::main]
async fn main() -> ExitCode {
	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			// 日志可能还没初始化 同时输出到 stderr
			error!("Order server failed: {:#}", e);
			eprintln!("Order server failed: {:#}", e);
			ExitCode::FAILURE
		}
	}
}

async fn run() -> anyhow::Result<()> {
	let services = init::init_all().await?;
	let config = config::get_config();

	// 启动消费者 消费市场快照消息
	let consumer_tasks = consumer::start_consumers(config.bus.clone(), services.pipeline.clone()).await?;
	info!("Market consumer tasks started");

	let addr = config.server.get_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	info!("🚀 Order Server is running at {}", listener.local_addr()?);

	let app = server::app(server::AppState::new(services.query.clone()), config.server.request_timeout());

	// 使用 axum 的 with_graceful_shutdown 实现优雅停机
	axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).with_graceful_shutdown(graceful::shutdown_signal()).await?;

	let drain = futures_util::future::join_all(consumer_tasks);
	if tokio::time::timeout(Duration::from_secs(GRACEFUL_TASKS_WAIT_SECS), drain).await.is_err() {
		warn!("Consumer tasks did not stop within {}s", GRACEFUL_TASKS_WAIT_SECS);
	}

	common::redis_pool::close_bus_pool();
	services.store.close().await;
	info!("Order server stopped");
	Ok(())
}
