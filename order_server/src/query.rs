use {
	crate::{
		error::QueryError,
		merge::merge_orders,
		storage::SnapshotStore,
	},
	common::market_types::MarketKey,
	std::sync::Arc,
	tracing::error,
};

/// 三种只读查询 查库后合并成一个 orders 数组
#[derive(Clone)]
pub struct QueryService {
	store: Arc<dyn SnapshotStore>,
}

impl QueryService {
	pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
		Self { store }
	}

	pub async fn orders_by_region(&self, region_id: i64) -> Result<Vec<u8>, QueryError> {
		let rows = self.store.query_by_region(region_id).await.inspect_err(|e| error!("region_id={} - Failed to query markets: {}", region_id, e))?;
		merge_rows(rows).inspect_err(|e| error!("region_id={} - Failed to merge markets: {}", region_id, e))
	}

	pub async fn orders_by_type(&self, type_id: i64) -> Result<Vec<u8>, QueryError> {
		let rows = self.store.query_by_type(type_id).await.inspect_err(|e| error!("type_id={} - Failed to query markets: {}", type_id, e))?;
		merge_rows(rows).inspect_err(|e| error!("type_id={} - Failed to merge markets: {}", type_id, e))
	}

	/// 主键查询 没有这一行返回 NotFound 而不是 `[]`
	pub async fn orders_by_region_and_type(&self, region_id: i64, type_id: i64) -> Result<Vec<u8>, QueryError> {
		let key = MarketKey::new(region_id, type_id);
		let rows = self.store.query_by_region_and_type(key).await.inspect_err(|e| error!("market={} - Failed to query market: {}", key, e))?;
		if rows.is_empty() {
			return Err(QueryError::NotFound(key));
		}
		merge_rows(rows).inspect_err(|e| error!("market={} - Failed to merge market: {}", key, e))
	}
}

fn merge_rows(rows: Vec<Vec<u8>>) -> Result<Vec<u8>, QueryError> {
	Ok(merge_orders(rows)?)
}
