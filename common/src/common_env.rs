use {
	crate::consts::{COMMON_ENV_PATH, ENV_PREFIX},
	config::{Config, Environment},
	serde::{Deserialize, Serialize},
	std::path::Path,
	tokio::sync::OnceCell,
};

#[derive(Clone, Deserialize, Serialize)]
pub struct CommonEnv {
	pub run_mode: String,

	// PostgreSQL 连接串 例如 postgres://order-server@localhost:5432/order-server
	pub postgres_url: String,

	// 消息总线 Redis 配置
	pub bus_redis_host: String,
	pub bus_redis_password: Option<String>,
}

// 连接串和密码不打印
impl std::fmt::Debug for CommonEnv {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CommonEnv")
			.field("run_mode", &self.run_mode)
			.field("postgres_url", &redact_url(&self.postgres_url))
			.field("bus_redis_host", &self.bus_redis_host)
			.field("bus_redis_password", &self.bus_redis_password.as_ref().map(|_| "***"))
			.finish()
	}
}

pub static COMMON_ENV: OnceCell<CommonEnv> = OnceCell::const_new();

pub fn load_common_env() -> anyhow::Result<()> {
	// 文件存在时用 dotenvy 加载到进程环境变量 容器里一般直接注入环境变量
	if Path::new(COMMON_ENV_PATH).exists() {
		dotenvy::from_path(COMMON_ENV_PATH)?;
	}

	let common_env = from_environment()?;
	println!("Common env configuration: {:?}", common_env);
	COMMON_ENV.set(common_env)?;
	check_common_env(get_common_env())?;
	Ok(())
}

/// 使用 config crate 从 ORDER_SERVER_ 前缀的环境变量反序列化到 CommonEnv
pub fn from_environment() -> anyhow::Result<CommonEnv> {
	let config = Config::builder().add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_")).build()?;
	Ok(config.try_deserialize()?)
}

pub fn check_common_env(common_env: &CommonEnv) -> anyhow::Result<()> {
	// 验证 RUN_MODE
	crate::consts::validate_run_mode(&common_env.run_mode)?;

	if common_env.postgres_url.is_empty() {
		return Err(anyhow::anyhow!("PostgreSQL url is empty"));
	}
	if !common_env.postgres_url.starts_with("postgres://") && !common_env.postgres_url.starts_with("postgresql://") {
		return Err(anyhow::anyhow!("PostgreSQL url must start with postgres:// or postgresql://"));
	}
	if common_env.bus_redis_host.is_empty() {
		return Err(anyhow::anyhow!("Bus Redis host is empty"));
	}

	Ok(())
}

pub fn get_common_env() -> &'static CommonEnv {
	COMMON_ENV.get().expect("Common env not loaded")
}

/// 去掉 url 中的用户信息部分
pub fn redact_url(url: &str) -> String {
	match (url.find("://"), url.rfind('@')) {
		(Some(scheme_end), Some(at)) if at > scheme_end => format!("{}***{}", &url[..scheme_end + 3], &url[at..]),
		_ => url.to_string(),
	}
}
