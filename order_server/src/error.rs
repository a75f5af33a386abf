use {
	axum::{
		http::StatusCode,
		response::{IntoResponse, Response},
	},
	common::{
		codec::{DecodeError, EncodeError},
		market_types::{MarketKey, OrdersError, ValidationError},
	},
	std::time::Duration,
	thiserror::Error,
};

/// 存储层错误 事务的每一步单独区分
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Failed to begin transaction: {0}")]
	Begin(#[source] sqlx::Error),

	#[error("Failed to execute statement: {0}")]
	Exec(#[source] sqlx::Error),

	#[error("Failed to commit transaction: {0}")]
	Commit(#[source] sqlx::Error),

	#[error("Store {op} timed out after {after:?}")]
	Timeout { op: &'static str, after: Duration },
}

/// 入库失败 都会让消息不被确认从而重投
#[derive(Debug, Error)]
pub enum IngestError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Encode(#[from] EncodeError),

	#[error(transparent)]
	Store(#[from] StoreError),
}

/// 合并失败 任意一行出错整个结果作废
#[derive(Debug, Error)]
pub enum MergeError {
	#[error("Row {row}: {source}")]
	Decode { row: usize, source: DecodeError },

	#[error("Row {row}: {source}")]
	Orders { row: usize, source: OrdersError },
}

#[derive(Debug, Error)]
pub enum QueryError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Merge(#[from] MergeError),

	#[error("Market {0} not found")]
	NotFound(MarketKey),
}

impl QueryError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			QueryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
			// 客户端看不出是没有数据还是数据损坏 区别只在日志里
			QueryError::Merge(_) | QueryError::NotFound(_) => StatusCode::NOT_FOUND,
		}
	}
}

// 只返回状态码 不带错误详情
impl IntoResponse for QueryError {
	fn into_response(self) -> Response {
		self.status_code().into_response()
	}
}

/// stream 消息本身不可用 不进入处理流程 直接转存死信
#[derive(Debug, Error)]
pub enum BusEntryError {
	#[error("Entry has no {0} field")]
	MissingField(String),

	#[error("Entry field {field} is not a byte string: {source}")]
	NotBytes { field: String, source: redis::RedisError },
}
