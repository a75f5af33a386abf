use {
	crate::{
		config::BusConfig,
		error::BusEntryError,
		pipeline::{Delivery, IngestionPipeline},
	},
	async_trait::async_trait,
	common::{consts::MARKET_STREAM_MAXLEN, redis_pool},
	redis::{
		AsyncCommands,
		streams::{StreamClaimReply, StreamDeletionPolicy, StreamId, StreamMaxlen, StreamPendingCountReply, StreamPendingId, StreamRangeReply, StreamReadOptions, StreamReadReply, XAckDelStatusCode},
	},
	std::{ops::ControlFlow, sync::Arc, time::Duration},
	tokio::{
		sync::{OnceCell, OwnedSemaphorePermit, Semaphore, broadcast},
		task::{JoinHandle, JoinSet},
	},
	tracing::{debug, error, info, warn},
	uuid::Uuid,
};

static SHUTDOWN: OnceCell<broadcast::Sender<()>> = OnceCell::const_new();

/// 初始化 shutdown sender
pub fn init_shutdown() {
	let (tx, _) = broadcast::channel(1);
	let _ = SHUTDOWN.set(tx);
}

/// 获取 shutdown receiver
pub fn get_shutdown_receiver() -> broadcast::Receiver<()> {
	SHUTDOWN.get().expect("SHUTDOWN not initialized").subscribe()
}

/// 发送 shutdown 信号
pub fn send_shutdown() {
	if let Some(sender) = SHUTDOWN.get() {
		let _ = sender.send(());
	}
}

/// 取出消息体字段
pub fn message_body(stream_id: &StreamId, msg_key: &str) -> Result<Vec<u8>, BusEntryError> {
	let value = stream_id.map.get(msg_key).ok_or_else(|| BusEntryError::MissingField(msg_key.to_string()))?;
	redis::from_redis_value::<Vec<u8>>(value).map_err(|source| BusEntryError::NotBytes { field: msg_key.to_string(), source })
}

/// XPENDING 返回的一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
	pub id: String,
	pub idle_ms: usize,
	pub deliveries: usize,
}

impl From<StreamPendingId> for PendingEntry {
	fn from(entry: StreamPendingId) -> Self {
		Self { id: entry.id, idle_ms: entry.last_delivered_ms, deliveries: entry.times_delivered }
	}
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PendingSplit {
	pub claim: Vec<String>,
	pub dead_letter: Vec<PendingEntry>,
}

/// 空闲不够久的跳过 投递次数达到上限的转存死信 其余重新认领
pub fn split_pending<I>(entries: I, claim_min_idle_ms: usize, max_deliveries: usize) -> PendingSplit
where
	I: IntoIterator<Item = PendingEntry>,
{
	let mut split = PendingSplit::default();
	for entry in entries.into_iter().filter(|entry| entry.idle_ms >= claim_min_idle_ms) {
		if entry.deliveries >= max_deliveries {
			split.dead_letter.push(entry);
		} else {
			split.claim.push(entry.id);
		}
	}
	split
}

/// 一条 stream 消息 确认用 XACKDEL 失败时保持 pending 由认领任务重投
pub struct RedisDelivery {
	stream: String,
	group: String,
	id: String,
	body: Vec<u8>,
}

#[async_trait]
impl Delivery for RedisDelivery {
	fn id(&self) -> &str {
		&self.id
	}

	fn body(&self) -> &[u8] {
		&self.body
	}

	async fn ack(&self) -> anyhow::Result<()> {
		let mut conn = redis_pool::get_bus_connection().await?;
		let result: Vec<XAckDelStatusCode> = conn.xack_del(&self.stream, &self.group, &[&self.id], StreamDeletionPolicy::DelRef).await?;
		debug!("msg_id={} - XACKDEL {:?}", self.id, result);
		Ok(())
	}

	async fn fail(&self, reason: &str) -> anyhow::Result<()> {
		// 不确认 留在 pending 列表里等待重新认领
		debug!("msg_id={} - Left pending for redelivery: {}", self.id, reason);
		Ok(())
	}
}

/// 在途上限和并发处理上限
struct ConsumerLimits {
	in_flight: Arc<Semaphore>,
	handlers: Arc<Semaphore>,
}

struct Consumer {
	config: BusConfig,
	consumer_id: String,
	pipeline: IngestionPipeline,
	limits: ConsumerLimits,
}

/// 创建消费组并启动拉取任务和认领任务
pub async fn start_consumers(config: BusConfig, pipeline: IngestionPipeline) -> anyhow::Result<Vec<JoinHandle<()>>> {
	let mut conn = redis_pool::get_bus_connection().await?;

	// 确保消费者组存在
	let res: redis::RedisResult<()> = conn.xgroup_create_mkstream(&config.stream, &config.group, "0").await;
	if let Err(e) = res {
		// 组已存在时返回 BUSYGROUP
		info!("XGROUP CREATE {} {}: {}", config.stream, config.group, e);
	}

	let consumer_id = format!("{}-{}", config.consumer_name_prefix, Uuid::new_v4());
	let _: bool = conn.xgroup_createconsumer(&config.stream, &config.group, &consumer_id).await?;

	let consumer = Arc::new(Consumer {
		limits: ConsumerLimits { in_flight: Arc::new(Semaphore::new(config.max_in_flight)), handlers: Arc::new(Semaphore::new(config.consumer_count)) },
		config,
		consumer_id,
		pipeline,
	});
	info!(
		"Started consumer {} in group {} on stream {} (handlers: {}, max in flight: {})",
		consumer.consumer_id, consumer.config.group, consumer.config.stream, consumer.config.consumer_count, consumer.config.max_in_flight
	);

	Ok(vec![tokio::spawn(consumer.clone().fetch_task()), tokio::spawn(consumer.reclaim_task())])
}

impl Consumer {
	/// 拉取新消息 每条消息先占一个在途名额 确认或失败后释放
	async fn fetch_task(self: Arc<Self>) {
		let mut shutdown_receiver = get_shutdown_receiver();
		let mut tasks = JoinSet::new();

		// 在 loop 外部获取连接
		let mut conn = match redis_pool::get_bus_connection().await {
			Ok(conn) => conn,
			Err(e) => {
				error!("Failed to get redis connection for consumer {}: {}", self.consumer_id, e);
				return;
			}
		};

		loop {
			while tasks.try_join_next().is_some() {}

			let first = tokio::select! {
				permit = self.limits.in_flight.clone().acquire_owned() => match permit {
					Ok(permit) => permit,
					Err(_) => break,
				},
				_ = shutdown_receiver.recv() => {
					info!("Consumer {} received shutdown signal", self.consumer_id);
					break;
				}
			};
			let mut permits = vec![first];
			while permits.len() < self.config.batch_size {
				match self.limits.in_flight.clone().try_acquire_owned() {
					Ok(permit) => permits.push(permit),
					Err(_) => break,
				}
			}

			tokio::select! {
				// 没有 future 交叉同时 await，所以借用是安全的
				result = read_new_messages(&mut conn, &self.config, &self.consumer_id, permits.len()) => {
					match result {
						Ok(entries) => {
							for (stream_id, permit) in entries.into_iter().zip(permits.drain(..)) {
								self.dispatch(&mut tasks, stream_id, permit);
							}
						}
						Err(e) => {
							error!("Error reading messages for consumer {}: {}, reconnecting...", self.consumer_id, e);
							match redis_pool::get_bus_connection().await {
								Ok(new_conn) => {
									conn = new_conn;
									info!("Redis connection reestablished for consumer {}", self.consumer_id);
								}
								Err(e) => {
									error!("Failed to reconnect for consumer {}: {}", self.consumer_id, e);
									tokio::time::sleep(Duration::from_secs(1)).await;
								}
							}
						}
					}
				}
				_ = shutdown_receiver.recv() => {
					info!("Consumer {} received shutdown signal", self.consumer_id);
					break;
				}
			}
		}

		// 等正在处理的消息结束 未确认的留在 pending 里
		while tasks.join_next().await.is_some() {}
		info!("Consumer {} stopped", self.consumer_id);
	}

	/// 周期性认领空闲过久的 pending 消息 投递次数耗尽的转存死信
	async fn reclaim_task(self: Arc<Self>) {
		let mut shutdown_receiver = get_shutdown_receiver();
		let mut tasks = JoinSet::new();
		let mut interval = tokio::time::interval(Duration::from_secs(self.config.claim_interval_secs));

		let mut conn = match redis_pool::get_bus_connection().await {
			Ok(conn) => conn,
			Err(e) => {
				error!("Failed to get redis connection for reclaim {}: {}", self.consumer_id, e);
				return;
			}
		};

		loop {
			while tasks.try_join_next().is_some() {}

			tokio::select! {
				_ = interval.tick() => {}
				_ = shutdown_receiver.recv() => {
					info!("Reclaim task {} received shutdown signal", self.consumer_id);
					break;
				}
			}

			match self.reclaim_pending(&mut conn, &mut tasks, &mut shutdown_receiver).await {
				Ok(ControlFlow::Continue(())) => {}
				Ok(ControlFlow::Break(())) => {
					info!("Reclaim task {} received shutdown signal", self.consumer_id);
					break;
				}
				Err(e) => {
					error!("Error reclaiming pending messages for consumer {}: {}, reconnecting...", self.consumer_id, e);
					match redis_pool::get_bus_connection().await {
						Ok(new_conn) => conn = new_conn,
						Err(e) => error!("Failed to reconnect for reclaim {}: {}", self.consumer_id, e),
					}
				}
			}
		}

		while tasks.join_next().await.is_some() {}
	}

	async fn reclaim_pending<C: AsyncCommands>(&self, conn: &mut C, tasks: &mut JoinSet<()>, shutdown_receiver: &mut broadcast::Receiver<()>) -> anyhow::Result<ControlFlow<()>> {
		let config = &self.config;
		let pending: StreamPendingCountReply = conn.xpending_count(&config.stream, &config.group, "-", "+", config.batch_size).await?;
		let split = split_pending(pending.ids.into_iter().map(PendingEntry::from), config.claim_min_idle_ms, config.max_deliveries);

		for entry in &split.dead_letter {
			let range: StreamRangeReply = conn.xrange(&config.stream, &entry.id, &entry.id).await?;
			let Some(stream_id) = range.ids.into_iter().next() else {
				// 消息已被裁剪或删除 只清掉 pending 记录
				warn!("msg_id={} - Pending entry is gone from {}, dropping it without dead letter", entry.id, config.stream);
				ack_del(conn, config, &entry.id).await?;
				continue;
			};
			let body = message_body(&stream_id, &config.msg_key).ok();
			dead_letter(conn, config, &entry.id, body, &format!("delivered {} times", entry.deliveries)).await?;
		}
		if split.claim.is_empty() {
			return Ok(ControlFlow::Continue(()));
		}

		let Some(permits) = self.acquire_in_flight(split.claim.len(), shutdown_receiver).await else {
			return Ok(ControlFlow::Break(()));
		};

		let claimed: StreamClaimReply = conn.xclaim(&config.stream, &config.group, &self.consumer_id, config.claim_min_idle_ms, &split.claim).await?;
		info!("Consumer {} reclaimed {} of {} idle pending messages", self.consumer_id, claimed.ids.len(), split.claim.len());
		for (stream_id, permit) in claimed.ids.into_iter().zip(permits) {
			self.dispatch(tasks, stream_id, permit);
		}
		Ok(ControlFlow::Continue(()))
	}

	/// 等待在途名额 收到 shutdown 时放弃并返回 None
	async fn acquire_in_flight(&self, count: usize, shutdown_receiver: &mut broadcast::Receiver<()>) -> Option<Vec<OwnedSemaphorePermit>> {
		let acquire = async {
			let mut permits = Vec::with_capacity(count);
			for _ in 0..count {
				permits.push(self.limits.in_flight.clone().acquire_owned().await.ok()?);
			}
			Some(permits)
		};
		tokio::select! {
			permits = acquire => permits,
			_ = shutdown_receiver.recv() => None,
		}
	}

	fn dispatch(&self, tasks: &mut JoinSet<()>, stream_id: StreamId, in_flight: OwnedSemaphorePermit) {
		let body = match message_body(&stream_id, &self.config.msg_key) {
			Ok(body) => body,
			Err(e) => {
				// 没有消息体 重投也不会成功
				warn!("msg_id={} - Unusable stream entry: {}", stream_id.id, e);
				let config = self.config.clone();
				tasks.spawn(async move {
					let _in_flight = in_flight;
					let result = match redis_pool::get_bus_connection().await {
						Ok(mut conn) => dead_letter(&mut conn, &config, &stream_id.id, None, &e.to_string()).await,
						Err(e) => Err(e),
					};
					if let Err(e) = result {
						error!("msg_id={} - Failed to dead letter entry, left pending: {}", stream_id.id, e);
					}
				});
				return;
			}
		};

		let delivery = RedisDelivery { stream: self.config.stream.clone(), group: self.config.group.clone(), id: stream_id.id, body };
		let pipeline = self.pipeline.clone();
		let handlers = self.limits.handlers.clone();
		tasks.spawn(async move {
			let _in_flight = in_flight;
			let Ok(_handler) = handlers.acquire_owned().await else {
				return;
			};
			let outcome = pipeline.handle(&delivery).await;
			debug!("msg_id={} - {:?}", delivery.id(), outcome);
		});
	}
}

async fn ack_del<C: AsyncCommands>(conn: &mut C, config: &BusConfig, id: &str) -> anyhow::Result<()> {
	let _: Vec<XAckDelStatusCode> = conn.xack_del(&config.stream, &config.group, &[id], StreamDeletionPolicy::DelRef).await?;
	Ok(())
}

/// 复制到死信 stream 再从原 stream 确认删除 消息体缺失时只记来源和原因
async fn dead_letter<C: AsyncCommands>(conn: &mut C, config: &BusConfig, id: &str, body: Option<Vec<u8>>, reason: &str) -> anyhow::Result<()> {
	let mut fields: Vec<(&str, Vec<u8>)> = vec![("source_id", id.as_bytes().to_vec()), ("reason", reason.as_bytes().to_vec())];
	if let Some(body) = body {
		fields.push((config.msg_key.as_str(), body));
	}
	let dead_id: String = conn.xadd_maxlen(&config.dead_letter_stream, StreamMaxlen::Approx(MARKET_STREAM_MAXLEN), "*", &fields).await?;
	ack_del(conn, config, id).await?;

	warn!("msg_id={} - Moved to {} as {}: {}", id, config.dead_letter_stream, dead_id, reason);
	Ok(())
}

/// 使用 XREADGROUP 读取新消息
async fn read_new_messages<C: AsyncCommands>(conn: &mut C, config: &BusConfig, consumer_id: &str, count: usize) -> anyhow::Result<Vec<StreamId>> {
	let options = StreamReadOptions::default().group(&config.group, consumer_id).count(count).block(config.block_ms);
	let result: Option<StreamReadReply> = conn.xread_options(&[&config.stream], &[">"], &options).await.map_err(|e| anyhow::anyhow!("Redis XREADGROUP error: {}", e))?;

	Ok(result.map(|reply| reply.keys.into_iter().filter(|stream_key| stream_key.key == config.stream).flat_map(|stream_key| stream_key.ids).collect()).unwrap_or_default())
}
