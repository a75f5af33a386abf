use {
	common::{
		consts::{MARKET_CONSUMER_GROUP, MARKET_CONSUMER_NAME_PREFIX, MARKET_DEAD_LETTER_STREAM, MARKET_MSG_KEY, MARKET_STREAM},
		logging::LoggingConfig,
		postgres_pool::PostgresConfig,
	},
	config::{Config, File},
	serde::{Deserialize, Serialize},
	std::time::Duration,
	tokio::sync::OnceCell,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderServerConfig {
	pub logging: LoggingConfig,
	pub server: ServerConfig,
	pub postgres: PostgresConfig,
	pub store: StoreConfig,
	pub bus: BusConfig,
	pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
	pub port: u16,
	pub request_timeout_secs: u64,
}

impl ServerConfig {
	pub fn get_addr(&self) -> String {
		format!("0.0.0.0:{}", self.port)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
	/// 单次事务（begin 到 commit）的最长时间
	pub statement_timeout_ms: u64,
}

impl StoreConfig {
	pub fn statement_timeout(&self) -> Duration {
		Duration::from_millis(self.statement_timeout_ms)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
	#[serde(default = "default_stream")]
	pub stream: String,
	#[serde(default = "default_group")]
	pub group: String,
	#[serde(default = "default_consumer_name_prefix")]
	pub consumer_name_prefix: String,
	#[serde(default = "default_msg_key")]
	pub msg_key: String,
	/// 并发处理者数量
	pub consumer_count: usize,
	/// 已接收未确认的消息上限
	pub max_in_flight: usize,
	pub batch_size: usize,
	pub block_ms: usize,
	/// pending 消息空闲多久后重新认领
	pub claim_min_idle_ms: usize,
	pub claim_interval_secs: u64,
	/// 超过投递次数转存死信
	pub max_deliveries: usize,
	#[serde(default = "default_dead_letter_stream")]
	pub dead_letter_stream: String,
}

fn default_stream() -> String {
	MARKET_STREAM.to_string()
}

fn default_group() -> String {
	MARKET_CONSUMER_GROUP.to_string()
}

fn default_consumer_name_prefix() -> String {
	MARKET_CONSUMER_NAME_PREFIX.to_string()
}

fn default_msg_key() -> String {
	MARKET_MSG_KEY.to_string()
}

fn default_dead_letter_stream() -> String {
	MARKET_DEAD_LETTER_STREAM.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
	/// 入库前校验 orders 是顶层数组
	pub validate_orders: bool,
}

pub static CONFIG: OnceCell<OrderServerConfig> = OnceCell::const_new();

pub fn load_config(config_path: &str) -> anyhow::Result<()> {
	let run_mode = &common::common_env::get_common_env().run_mode;

	let config = Config::builder().add_source(File::with_name(&format!("{}/{}", config_path, run_mode)).required(true)).build()?;

	let order_server_config: OrderServerConfig = config.try_deserialize()?;
	println!("Configuration loaded for mode: {}", run_mode);
	println!("Configuration: {:?}", order_server_config);
	order_server_config.check()?;
	CONFIG.set(order_server_config)?;
	Ok(())
}

impl OrderServerConfig {
	pub fn check(&self) -> anyhow::Result<()> {
		self.logging.check()?;
		self.postgres.check()?;
		self.bus.check()?;
		if self.server.request_timeout_secs == 0 {
			return Err(anyhow::anyhow!("Server request_timeout_secs must be greater than 0"));
		}
		if self.store.statement_timeout_ms == 0 {
			return Err(anyhow::anyhow!("Store statement_timeout_ms must be greater than 0"));
		}
		// 处理中的消息不能被认领走 否则会被处理两次
		if self.bus.claim_min_idle_ms as u64 <= self.store.statement_timeout_ms {
			return Err(anyhow::anyhow!("Bus claim_min_idle_ms must be greater than store statement_timeout_ms"));
		}
		Ok(())
	}
}

impl BusConfig {
	pub fn check(&self) -> anyhow::Result<()> {
		if self.stream.is_empty() || self.group.is_empty() || self.msg_key.is_empty() || self.dead_letter_stream.is_empty() {
			return Err(anyhow::anyhow!("Bus stream, group, msg_key and dead_letter_stream must not be empty"));
		}
		if self.stream == self.dead_letter_stream {
			return Err(anyhow::anyhow!("Bus dead_letter_stream must differ from stream"));
		}
		if self.consumer_count == 0 {
			return Err(anyhow::anyhow!("Bus consumer_count must be greater than 0"));
		}
		if self.max_in_flight < self.consumer_count {
			return Err(anyhow::anyhow!("Bus max_in_flight must be at least consumer_count"));
		}
		// BLOCK 0 表示无限等待 会一直占着在途名额
		if self.block_ms == 0 {
			return Err(anyhow::anyhow!("Bus block_ms must be greater than 0"));
		}
		if self.batch_size == 0 {
			return Err(anyhow::anyhow!("Bus batch_size must be greater than 0"));
		}
		if self.max_deliveries == 0 {
			return Err(anyhow::anyhow!("Bus max_deliveries must be greater than 0"));
		}
		if self.claim_interval_secs == 0 {
			return Err(anyhow::anyhow!("Bus claim_interval_secs must be greater than 0"));
		}
		Ok(())
	}
}

pub fn get_config() -> &'static OrderServerConfig {
	CONFIG.get().expect("Config not loaded")
}
