use {
	crate::consts::REDIS_POOL_MAX_SIZE,
	deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime},
	redis::AsyncCommands,
	tokio::sync::OnceCell,
};

// 消息总线连接池（订单快照 stream 的消费和死信转存）
pub static BUS_POOL: OnceCell<Pool> = OnceCell::const_new();

pub fn redis_url(redis_host: &str, redis_password: Option<&str>, db: u32) -> String {
	format!("redis://{}{}/{}", if let Some(pwd) = redis_password { format!(":{}@", pwd) } else { "".to_string() }, redis_host, db)
}

/// 初始化消息总线连接池
pub async fn init_bus_pool(redis_host: &str, redis_password: Option<String>, db: u32) -> anyhow::Result<()> {
	let mut cfg = Config::from_url(redis_url(redis_host, redis_password.as_deref(), db));
	cfg.pool = Some(PoolConfig::new(REDIS_POOL_MAX_SIZE));
	let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
	BUS_POOL.set(pool)?;
	Ok(())
}

/// 获取消息总线连接池
pub fn get_bus_pool() -> anyhow::Result<Pool> {
	BUS_POOL.get().cloned().ok_or_else(|| anyhow::anyhow!("Bus Redis pool not initialized"))
}

/// 获取消息总线连接
pub async fn get_bus_connection() -> anyhow::Result<Connection> {
	let pool = get_bus_pool()?;
	pool.get().await.map_err(|e| anyhow::anyhow!("Failed to get bus redis connection: {}", e))
}

/// Ping 消息总线
pub async fn ping_bus() -> anyhow::Result<()> {
	get_bus_connection().await?.ping().await.map_err(|e| anyhow::anyhow!("Bus Redis ping error: {}", e))
}

/// 关闭消息总线连接池
pub fn close_bus_pool() {
	if let Some(pool) = BUS_POOL.get() {
		pool.close();
	}
}
