//! 快照负载的压缩编解码
//!
//! 只处理字节 不关心负载是否是 json。约定 `decompress(compress(x)) == x`，
//! 其余任何输入（空、截断、非本编码产生的数据）解码都返回 [`DecodeError`]。

use {
	crate::consts::CODEC_COMPRESSION_LEVEL,
	std::io::{Read, Write},
	thiserror::Error,
};

/// zstd 帧头魔数（小端）
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

#[derive(Debug, Error)]
#[error("Failed to compress payload: {0}")]
pub struct EncodeError(#[from] std::io::Error);

#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("Payload is not a compressed frame ({len} bytes)")]
	NotAFrame { len: usize },

	#[error("Corrupt or truncated compressed payload: {0}")]
	Corrupt(#[from] std::io::Error),
}

/// 压缩 开启内容校验和 截断和位翻转都能在解码时发现
pub fn compress(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
	let mut encoder = zstd::stream::Encoder::new(Vec::with_capacity(data.len() / 4 + 16), CODEC_COMPRESSION_LEVEL)?;
	encoder.include_checksum(true)?;
	encoder.write_all(data)?;
	Ok(encoder.finish()?)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
	if data.len() < ZSTD_MAGIC.len() || data[..ZSTD_MAGIC.len()] != ZSTD_MAGIC {
		return Err(DecodeError::NotAFrame { len: data.len() });
	}

	let mut decoder = zstd::stream::Decoder::new(data)?;
	let mut out = Vec::with_capacity(data.len() * 4);
	decoder.read_to_end(&mut out)?;
	Ok(out)
}
