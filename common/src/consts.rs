pub const COMMON_ENV_PATH: &str = "./deploy/common.env";
pub const ORDER_SERVER_CONFIG_PATH: &str = "./deploy/order_server";

/// 环境变量前缀 例如 ORDER_SERVER_POSTGRES_URL
pub const ENV_PREFIX: &str = "ORDER_SERVER";

///市场订单快照推送的stream 消息体是原始json
pub const MARKET_STREAM: &str = "orders";
pub const MARKET_MSG_KEY: &str = "market";

///消费组 对应一组并发的处理者
pub const MARKET_CONSUMER_GROUP: &str = "order-store";
pub const MARKET_CONSUMER_NAME_PREFIX: &str = "order-store-consumer";

///投递次数耗尽的消息转存到这里 不再重投
pub const MARKET_DEAD_LETTER_STREAM: &str = "orders-dead-letter";

/// Redis Stream 最大长度限制（使用 MAXLEN ~ 近似裁剪以提高性能）
pub const MARKET_STREAM_MAXLEN: usize = 10000;

/// 运行模式常量
pub const RUN_MODE_DEV: &str = "dev";
pub const RUN_MODE_PROD: &str = "prod";

/// 消息总线使用的 Redis DB
pub const REDIS_DB_BUS: u32 = 0;

pub const REDIS_POOL_MAX_SIZE: usize = 32;

/// PostgreSQL 连接池配置常量
pub const POSTGRES_MAX_CONNECTIONS: u32 = 20;
pub const POSTGRES_MIN_CONNECTIONS: u32 = 1;
pub const POSTGRES_IDLE_TIMEOUT_SECS: u64 = 600;
pub const POSTGRES_MAX_LIFETIME_SECS: u64 = 1800;
pub const POSTGRES_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const POSTGRES_TEST_BEFORE_ACQUIRE: bool = false;

/// zstd 压缩级别
pub const CODEC_COMPRESSION_LEVEL: i32 = 3;

/// 验证运行模式是否有效
pub fn validate_run_mode(run_mode: &str) -> anyhow::Result<()> {
	match run_mode {
		RUN_MODE_DEV | RUN_MODE_PROD => Ok(()),
		_ => Err(anyhow::anyhow!("Invalid RUN_MODE: {}. Must be either '{}' or '{}'", run_mode, RUN_MODE_DEV, RUN_MODE_PROD)),
	}
}
