pub mod config;
pub mod consts;
pub mod consumer;
pub mod error;
pub mod graceful;
pub mod handlers;
pub mod init;
pub mod merge;
pub mod pipeline;
pub mod query;
pub mod server;
pub mod storage;
