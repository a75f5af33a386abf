//! 把多行快照的 orders 数组拼成一个 json 数组
//!
//! 不对每行做完整的解析再序列化：orders 的值以原始文本取出，去掉外层 `[` `]`
//! 后直接逗号拼接。文档本身仍做 json 校验（见 `common::market_types::orders_elements`），
//! 所以拼接结果一定还是合法的 json 数组。

use {
	crate::error::MergeError,
	common::{codec, market_types::orders_elements},
};

/// 合并压缩后的快照 任何一行解压失败或 orders 不可用 整体失败
pub fn merge_orders<I, B>(rows: I) -> Result<Vec<u8>, MergeError>
where
	I: IntoIterator<Item = B>,
	B: AsRef<[u8]>,
{
	let mut merger = OrdersMerger::new();
	for row in rows {
		merger.push_compressed(row.as_ref())?;
	}
	Ok(merger.finish())
}

#[derive(Debug)]
pub struct OrdersMerger {
	buf: Vec<u8>,
	rows: usize,
	has_elements: bool,
}

impl Default for OrdersMerger {
	fn default() -> Self {
		Self::new()
	}
}

impl OrdersMerger {
	pub fn new() -> Self {
		Self { buf: vec![b'['], rows: 0, has_elements: false }
	}

	/// 追加一行压缩快照
	pub fn push_compressed(&mut self, compressed: &[u8]) -> Result<(), MergeError> {
		let row = self.rows;
		let snapshot = codec::decompress(compressed).map_err(|source| MergeError::Decode { row, source })?;
		self.push_snapshot(&snapshot)
	}

	/// 追加一行已解压的快照
	pub fn push_snapshot(&mut self, snapshot: &[u8]) -> Result<(), MergeError> {
		let row = self.rows;
		let elements = orders_elements(snapshot).map_err(|source| MergeError::Orders { row, source })?;
		self.rows += 1;

		// 空数组不贡献任何内容 避免出现 ",," 或 "[,"
		if elements.is_empty() {
			return Ok(());
		}
		if self.has_elements {
			self.buf.push(b',');
		}
		self.buf.extend_from_slice(elements.as_bytes());
		self.has_elements = true;
		Ok(())
	}

	pub fn rows(&self) -> usize {
		self.rows
	}

	pub fn finish(mut self) -> Vec<u8> {
		self.buf.push(b']');
		self.buf
	}
}
