use {tokio::signal, tracing::info};

/// 等待 SIGINT 或 SIGTERM
pub async fn wait_for_signal() {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{SignalKind, signal};
		let mut sigterm = match signal(SignalKind::terminate()) {
			Ok(sigterm) => sigterm,
			Err(e) => {
				info!("Failed to create SIGTERM signal handler: {}", e);
				let _ = signal::ctrl_c().await;
				info!("Received SIGINT, starting graceful shutdown...");
				return;
			}
		};
		tokio::select! {
			_ = signal::ctrl_c() => {
				info!("Received SIGINT, starting graceful shutdown...");
			}
			_ = sigterm.recv() => {
				info!("Received SIGTERM, starting graceful shutdown...");
			}
		}
	}
	#[cfg(not(unix))]
	{
		let _ = signal::ctrl_c().await;
		info!("Received SIGINT, starting graceful shutdown...");
	}
}

/// 等待系统信号并执行优雅停机
///
/// # 参数
/// - `shutdown_callback`: 通知消费者停止拉取的回调
/// - `consumer_wait_secs`: 给正在处理的消息留出的时间（秒）
///
/// 返回后调用方（例如 axum 的 with_graceful_shutdown）再停止接收新请求
pub async fn shutdown_signal_with_callback<F>(shutdown_callback: F, consumer_wait_secs: u64)
where
	F: FnOnce(),
{
	wait_for_signal().await;

	info!("Step 1: Sending shutdown signal to consumers...");
	shutdown_callback();

	info!("Step 2: Waiting for in-flight messages to complete (max {}s)...", consumer_wait_secs);
	tokio::time::sleep(tokio::time::Duration::from_secs(consumer_wait_secs)).await;

	info!("Step 3: Draining HTTP connections...");
}
