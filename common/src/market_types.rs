use {
	serde::Deserialize,
	serde_json::value::RawValue,
	std::fmt,
	thiserror::Error,
};

/// 快照的复合主键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketKey {
	pub region_id: i64,
	pub type_id: i64,
}

impl MarketKey {
	pub fn new(region_id: i64, type_id: i64) -> Self {
		Self { region_id, type_id }
	}
}

impl fmt::Display for MarketKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.region_id, self.type_id)
	}
}

/// 市场消息 `{ "regionID": <int>, "typeID": <int>, "orders": [...], ... }`
/// 只取主键字段 其余字段跳过不建树
#[derive(Debug, Deserialize)]
struct MarketHeader {
	#[serde(rename = "regionID")]
	region_id: i64,
	#[serde(rename = "typeID")]
	type_id: i64,
}

#[derive(Debug, Deserialize)]
struct OrdersView<'a> {
	#[serde(borrow)]
	orders: Option<&'a RawValue>,
}

#[derive(Debug, Error)]
pub enum OrdersError {
	#[error("Snapshot is not a JSON object")]
	NotAnObject,

	#[error("Snapshot is not valid JSON: {0}")]
	InvalidJson(#[source] serde_json::Error),

	#[error("Snapshot has no orders field")]
	Missing,

	#[error("Snapshot orders field is not an array")]
	NotAnArray,
}

#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Message is not a JSON object")]
	NotAnObject,

	/// regionID/typeID 缺失或不是整数
	#[error("Invalid market message header: {0}")]
	Header(#[source] serde_json::Error),

	#[error("Invalid market message orders: {0}")]
	Orders(#[from] OrdersError),
}

fn is_object(body: &[u8]) -> bool {
	body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{')
}

/// 取出消息中的 regionID 和 typeID（必须是 json 整数）
pub fn parse_market_key(body: &[u8]) -> Result<MarketKey, ValidationError> {
	if !is_object(body) {
		return Err(ValidationError::NotAnObject);
	}
	let header: MarketHeader = serde_json::from_slice(body).map_err(ValidationError::Header)?;
	Ok(MarketKey::new(header.region_id, header.type_id))
}

/// 定位顶层 orders 数组 返回数组内部的元素文本（不含 `[` `]`，已去掉首尾空白）
///
/// 整个文档仍会做 json 校验，但 orders 以原始文本借出，不构建解析树。
/// 空数组返回空串。
pub fn orders_elements(body: &[u8]) -> Result<&str, OrdersError> {
	if !is_object(body) {
		return Err(OrdersError::NotAnObject);
	}
	let view: OrdersView<'_> = serde_json::from_slice(body).map_err(OrdersError::InvalidJson)?;
	let raw = view.orders.ok_or(OrdersError::Missing)?.get();

	// RawValue 的文本就是值本身 前后没有空白
	raw.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')).map(str::trim).ok_or(OrdersError::NotAnArray)
}
