pub mod codec;
pub mod common_env;
pub mod consts;
pub mod graceful;
pub mod logging;
pub mod market_types;
pub mod postgres_pool;
pub mod redis_pool;
