use {
	crate::error::StoreError,
	async_trait::async_trait,
	common::market_types::MarketKey,
	sqlx::{PgPool, Postgres},
	std::{future::Future, time::Duration},
	tracing::debug,
};

/// 快照存储 (regionID, typeID) 唯一 写入即整体替换
///
/// 查询返回的是压缩后的原始负载 行顺序不保证 没有匹配返回空数组
#[async_trait]
pub trait SnapshotStore: Send + Sync {
	/// 插入或整体替换 同一个 key 并发写入时最后提交的生效
	async fn upsert(&self, key: MarketKey, payload: &[u8]) -> Result<(), StoreError>;

	async fn query_by_region(&self, region_id: i64) -> Result<Vec<Vec<u8>>, StoreError>;

	async fn query_by_type(&self, type_id: i64) -> Result<Vec<Vec<u8>>, StoreError>;

	/// 最多一行
	async fn query_by_region_and_type(&self, key: MarketKey) -> Result<Vec<Vec<u8>>, StoreError>;
}

const UPSERT_MARKET_SQL: &str = r#"INSERT INTO markets ("regionID", "typeID", "market") VALUES ($1, $2, $3) ON CONFLICT ("regionID", "typeID") DO UPDATE SET "market" = EXCLUDED."market""#;
const SELECT_BY_REGION_SQL: &str = r#"SELECT "market" FROM markets WHERE "regionID" = $1"#;
const SELECT_BY_TYPE_SQL: &str = r#"SELECT "market" FROM markets WHERE "typeID" = $1"#;
const SELECT_BY_PAIR_SQL: &str = r#"SELECT "market" FROM markets WHERE "regionID" = $1 AND "typeID" = $2"#;
const READ_ONLY_SNAPSHOT_SQL: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

#[derive(Debug, Clone, Copy)]
enum MarketFilter {
	Region(i64),
	Type(i64),
	Pair(MarketKey),
}

pub struct PgSnapshotStore {
	pool: PgPool,
	statement_timeout: Duration,
}

impl PgSnapshotStore {
	pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
		Self { pool, statement_timeout }
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}

	/// 执行内嵌的建表迁移
	pub async fn migrate(&self) -> anyhow::Result<()> {
		sqlx::migrate!("./migrations").run(&self.pool).await?;
		Ok(())
	}

	/// 关闭连接池（等待所有借出的连接归还）
	pub async fn close(&self) {
		self.pool.close().await;
	}

	// 超时后 future 被丢弃 未提交的事务随之回滚
	async fn with_deadline<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
	where
		F: Future<Output = Result<T, StoreError>>,
	{
		tokio::time::timeout(self.statement_timeout, fut).await.map_err(|_| StoreError::Timeout { op, after: self.statement_timeout })?
	}

	async fn select_markets(&self, filter: MarketFilter) -> Result<Vec<Vec<u8>>, StoreError> {
		self.with_deadline("query", async {
			let mut tx = self.pool.begin().await.map_err(StoreError::Begin)?;
			sqlx::query(READ_ONLY_SNAPSHOT_SQL).execute(&mut *tx).await.map_err(StoreError::Exec)?;

			let query = match filter {
				MarketFilter::Region(region_id) => sqlx::query_scalar::<Postgres, Vec<u8>>(SELECT_BY_REGION_SQL).bind(region_id),
				MarketFilter::Type(type_id) => sqlx::query_scalar::<Postgres, Vec<u8>>(SELECT_BY_TYPE_SQL).bind(type_id),
				MarketFilter::Pair(key) => sqlx::query_scalar::<Postgres, Vec<u8>>(SELECT_BY_PAIR_SQL).bind(key.region_id).bind(key.type_id),
			};
			let rows = query.fetch_all(&mut *tx).await.map_err(StoreError::Exec)?;

			tx.commit().await.map_err(StoreError::Commit)?;
			debug!("Fetched {} markets for {:?}", rows.len(), filter);
			Ok(rows)
		})
		.await
	}
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
	async fn upsert(&self, key: MarketKey, payload: &[u8]) -> Result<(), StoreError> {
		self.with_deadline("upsert", async {
			let mut tx = self.pool.begin().await.map_err(StoreError::Begin)?;
			sqlx::query(UPSERT_MARKET_SQL).bind(key.region_id).bind(key.type_id).bind(payload).execute(&mut *tx).await.map_err(StoreError::Exec)?;
			tx.commit().await.map_err(StoreError::Commit)?;
			Ok(())
		})
		.await
	}

	async fn query_by_region(&self, region_id: i64) -> Result<Vec<Vec<u8>>, StoreError> {
		self.select_markets(MarketFilter::Region(region_id)).await
	}

	async fn query_by_type(&self, type_id: i64) -> Result<Vec<Vec<u8>>, StoreError> {
		self.select_markets(MarketFilter::Type(type_id)).await
	}

	async fn query_by_region_and_type(&self, key: MarketKey) -> Result<Vec<Vec<u8>>, StoreError> {
		self.select_markets(MarketFilter::Pair(key)).await
	}
}
