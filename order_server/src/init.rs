use {
	crate::{
		config::{get_config, load_config},
		consumer,
		pipeline::IngestionPipeline,
		query::QueryService,
		storage::{PgSnapshotStore, SnapshotStore},
	},
	anyhow::Context,
	common::common_env,
	std::sync::Arc,
	tracing::info,
};

/// 启动时构造一次 之后注入到消费者和 HTTP 服务
pub struct Services {
	pub store: Arc<PgSnapshotStore>,
	pub pipeline: IngestionPipeline,
	pub query: QueryService,
}

pub async fn init_all() -> anyhow::Result<Services> {
	init_load().context("Failed to load configuration")?;
	init_logging().context("Failed to initialize logging")?;
	let store = init_store().await.context("Failed to initialize market store")?;
	init_redis_pool().await.context("Failed to initialize bus redis pool")?;
	consumer::init_shutdown();

	let shared: Arc<dyn SnapshotStore> = store.clone();
	let pipeline = IngestionPipeline::new(shared.clone(), get_config().ingest.validate_orders);
	let query = QueryService::new(shared);
	Ok(Services { store, pipeline, query })
}

fn init_load() -> anyhow::Result<()> {
	common_env::load_common_env()?;
	load_config(common::consts::ORDER_SERVER_CONFIG_PATH)?;
	Ok(())
}

fn init_logging() -> anyhow::Result<()> {
	common::logging::init_logging(&get_config().logging)
}

/// 连接数据库并执行迁移
async fn init_store() -> anyhow::Result<Arc<PgSnapshotStore>> {
	let env = common_env::get_common_env();
	let config = get_config();

	let pool = common::postgres_pool::init_postgres_pool(&env.postgres_url, config.postgres.pool_config()).await?;
	let store = PgSnapshotStore::new(pool, config.store.statement_timeout());
	store.migrate().await.context("Migrating the database failed")?;
	info!("Database migrated");
	Ok(Arc::new(store))
}

async fn init_redis_pool() -> anyhow::Result<()> {
	let env = common_env::get_common_env();
	common::redis_pool::init_bus_pool(&env.bus_redis_host, env.bus_redis_password.clone(), common::consts::REDIS_DB_BUS).await?;
	common::redis_pool::ping_bus().await?;
	info!("Bus Redis pool initialized (host: {}, db: {})", env.bus_redis_host, common::consts::REDIS_DB_BUS);
	Ok(())
}
