use {
	crate::{error::IngestError, storage::SnapshotStore},
	async_trait::async_trait,
	common::{
		codec,
		market_types::{MarketKey, ValidationError, orders_elements, parse_market_key},
	},
	std::sync::Arc,
	tracing::{debug, error, warn},
};

/// 总线投递的一条消息
///
/// `ack` 确认后不再投递；`fail` 表示处理失败，由总线按自己的策略重投。
/// 每条消息只会调用其中一个，且只调用一次。
#[async_trait]
pub trait Delivery: Send + Sync {
	fn id(&self) -> &str;

	fn body(&self) -> &[u8];

	async fn ack(&self) -> anyhow::Result<()>;

	async fn fail(&self, reason: &str) -> anyhow::Result<()>;
}

/// 单条消息的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
	Received,
	FieldsValidated,
	Compressed,
	Upserted,
	Acknowledged,
	Rejected,
	Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
	/// 已入库并确认
	Acknowledged(MarketKey),
	/// 已入库但确认失败 消息会被重投 重复写入同样的内容
	Unacknowledged(MarketKey),
	/// 字段校验失败 未确认
	Rejected,
	/// 压缩或存储失败 未确认
	Failed,
}

impl IngestOutcome {
	pub fn state(&self) -> IngestState {
		match self {
			IngestOutcome::Acknowledged(_) => IngestState::Acknowledged,
			IngestOutcome::Unacknowledged(_) => IngestState::Upserted,
			IngestOutcome::Rejected => IngestState::Rejected,
			IngestOutcome::Failed => IngestState::Failed,
		}
	}
}

#[derive(Clone)]
pub struct IngestionPipeline {
	store: Arc<dyn SnapshotStore>,
	validate_orders: bool,
}

impl IngestionPipeline {
	pub fn new(store: Arc<dyn SnapshotStore>, validate_orders: bool) -> Self {
		Self { store, validate_orders }
	}

	/// 校验 压缩整条原始消息 然后按 (regionID, typeID) 写入
	pub async fn ingest(&self, body: &[u8]) -> Result<MarketKey, IngestError> {
		let key = parse_market_key(body)?;
		if self.validate_orders {
			orders_elements(body).map_err(ValidationError::from)?;
		}
		debug!("market={} - {:?}", key, IngestState::FieldsValidated);

		let compressed = codec::compress(body)?;
		debug!("market={} - {:?} {} -> {} bytes", key, IngestState::Compressed, body.len(), compressed.len());

		self.store.upsert(key, &compressed).await?;
		debug!("market={} - {:?}", key, IngestState::Upserted);
		Ok(key)
	}

	/// 处理一条投递 并调用 ack 或 fail
	pub async fn handle<D: Delivery + ?Sized>(&self, delivery: &D) -> IngestOutcome {
		let msg_id = delivery.id();
		debug!("msg_id={} - {:?} {} bytes", msg_id, IngestState::Received, delivery.body().len());

		let (outcome, reason) = match self.ingest(delivery.body()).await {
			Ok(key) => match delivery.ack().await {
				Ok(()) => return IngestOutcome::Acknowledged(key),
				Err(e) => {
					error!("msg_id={}, market={} - Failed to ack message: {}", msg_id, key, e);
					return IngestOutcome::Unacknowledged(key);
				}
			},
			Err(IngestError::Validation(e)) => {
				warn!("msg_id={} - Rejected market message: {}", msg_id, e);
				(IngestOutcome::Rejected, e.to_string())
			}
			Err(e) => {
				error!("msg_id={} - Failed to ingest market message: {}", msg_id, e);
				(IngestOutcome::Failed, e.to_string())
			}
		};

		if let Err(e) = delivery.fail(&reason).await {
			error!("msg_id={} - Failed to report message failure: {}", msg_id, e);
		}
		outcome
	}
}
