use {
	async_trait::async_trait,
	axum::{
		Router,
		body::{Body, to_bytes},
		http::{Request, StatusCode},
	},
	common::{codec, market_types::MarketKey},
	order_server::{
		error::StoreError,
		pipeline::{Delivery, IngestionPipeline},
		query::QueryService,
		server::{AppState, app},
		storage::SnapshotStore,
	},
	std::{
		collections::HashMap,
		sync::{
			Arc, Mutex,
			atomic::{AtomicBool, AtomicUsize, Ordering},
		},
		time::Duration,
	},
	tower::ServiceExt,
};

/// 内存版快照存储 写入在锁内整体替换
#[derive(Default)]
pub struct MemorySnapshotStore {
	rows: Mutex<HashMap<MarketKey, Vec<u8>>>,
	fail_writes: AtomicBool,
	fail_reads: AtomicBool,
}

#[allow(dead_code)]
impl MemorySnapshotStore {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn set_fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}

	pub fn set_fail_reads(&self, fail: bool) {
		self.fail_reads.store(fail, Ordering::SeqCst);
	}

	/// 直接写入一行 不经过编解码
	pub fn put_raw(&self, key: MarketKey, payload: Vec<u8>) {
		self.rows.lock().unwrap().insert(key, payload);
	}

	pub fn len(&self) -> usize {
		self.rows.lock().unwrap().len()
	}

	pub fn get(&self, key: MarketKey) -> Option<Vec<u8>> {
		self.rows.lock().unwrap().get(&key).cloned()
	}

	/// 取出并解压
	pub fn get_decompressed(&self, key: MarketKey) -> Option<Vec<u8>> {
		self.get(key).map(|payload| codec::decompress(&payload).unwrap())
	}

	fn select(&self, filter: impl Fn(&MarketKey) -> bool) -> Result<Vec<Vec<u8>>, StoreError> {
		if self.fail_reads.load(Ordering::SeqCst) {
			return Err(StoreError::Begin(sqlx::Error::PoolTimedOut));
		}
		Ok(self.rows.lock().unwrap().iter().filter(|(key, _)| filter(key)).map(|(_, payload)| payload.clone()).collect())
	}
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
	async fn upsert(&self, key: MarketKey, payload: &[u8]) -> Result<(), StoreError> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(StoreError::Commit(sqlx::Error::PoolClosed));
		}
		// 让并发写入有机会交错
		tokio::task::yield_now().await;
		self.rows.lock().unwrap().insert(key, payload.to_vec());
		Ok(())
	}

	async fn query_by_region(&self, region_id: i64) -> Result<Vec<Vec<u8>>, StoreError> {
		self.select(|key| key.region_id == region_id)
	}

	async fn query_by_type(&self, type_id: i64) -> Result<Vec<Vec<u8>>, StoreError> {
		self.select(|key| key.type_id == type_id)
	}

	async fn query_by_region_and_type(&self, key: MarketKey) -> Result<Vec<Vec<u8>>, StoreError> {
		self.select(|row_key| *row_key == key)
	}
}

/// 记录 ack/fail 次数的投递
pub struct RecordingDelivery {
	id: String,
	body: Vec<u8>,
	ack_error: bool,
	pub acks: AtomicUsize,
	pub fails: AtomicUsize,
	pub last_reason: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl RecordingDelivery {
	pub fn new(body: impl Into<Vec<u8>>) -> Self {
		Self { id: "1-0".to_string(), body: body.into(), ack_error: false, acks: AtomicUsize::new(0), fails: AtomicUsize::new(0), last_reason: Mutex::new(None) }
	}

	pub fn with_ack_error(mut self) -> Self {
		self.ack_error = true;
		self
	}

	pub fn acks(&self) -> usize {
		self.acks.load(Ordering::SeqCst)
	}

	pub fn fails(&self) -> usize {
		self.fails.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Delivery for RecordingDelivery {
	fn id(&self) -> &str {
		&self.id
	}

	fn body(&self) -> &[u8] {
		&self.body
	}

	async fn ack(&self) -> anyhow::Result<()> {
		if self.ack_error {
			return Err(anyhow::anyhow!("connection reset"));
		}
		self.acks.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn fail(&self, reason: &str) -> anyhow::Result<()> {
		self.fails.fetch_add(1, Ordering::SeqCst);
		*self.last_reason.lock().unwrap() = Some(reason.to_string());
		Ok(())
	}
}

#[allow(dead_code)]
pub fn pipeline(store: &Arc<MemorySnapshotStore>) -> IngestionPipeline {
	IngestionPipeline::new(store.clone(), true)
}

#[allow(dead_code)]
pub fn lazy_pipeline(store: &Arc<MemorySnapshotStore>) -> IngestionPipeline {
	IngestionPipeline::new(store.clone(), false)
}

#[allow(dead_code)]
pub fn test_app(store: &Arc<MemorySnapshotStore>) -> Router {
	app(AppState::new(QueryService::new(store.clone())), Duration::from_secs(5))
}

/// 发一个 GET 请求 返回状态码 响应头和响应体
#[allow(dead_code)]
pub async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
	let request = Request::builder().uri(uri).header("origin", "http://example.com").body(Body::empty()).unwrap();
	let response = app.oneshot(request).await.unwrap();
	let status = response.status();
	let headers = response.headers().clone();
	let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
	(status, headers, body)
}

/// 解析 json 数组并按文本排序 行顺序不保证
#[allow(dead_code)]
pub fn sorted_elements(body: &[u8]) -> Vec<String> {
	let values: Vec<serde_json::Value> = serde_json::from_slice(body).unwrap();
	let mut elements: Vec<String> = values.iter().map(|value| value.to_string()).collect();
	elements.sort();
	elements
}

#[allow(dead_code)]
pub fn market_body(region_id: i64, type_id: i64, orders: &str) -> String {
	format!(r#"{{"regionID":{},"typeID":{},"orders":{}}}"#, region_id, type_id, orders)
}
