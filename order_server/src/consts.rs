/// 停机时给消费者处理在途消息的时间（秒）
pub const GRACEFUL_CONSUMER_WAIT_SECS: u64 = 3;

/// HTTP 停止后等待消费任务退出的上限（秒）
pub const GRACEFUL_TASKS_WAIT_SECS: u64 = 10;
