use {
	crate::{
		handlers::{handle_hi, handle_region_orders, handle_region_type_orders, handle_type_orders},
		query::QueryService,
	},
	axum::{Router, http::HeaderName, routing::get},
	std::time::Duration,
	tower_http::{
		compression::CompressionLayer,
		cors::{Any, CorsLayer},
		request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
		timeout::TimeoutLayer,
		trace::TraceLayer,
	},
};

#[derive(Clone)]
pub struct AppState {
	pub query: QueryService,
}

impl AppState {
	pub fn new(query: QueryService) -> Self {
		Self { query }
	}
}

pub fn app(state: AppState, request_timeout: Duration) -> Router {
	let x_request_id = HeaderName::from_static("x-request-id");
	let orders_router = Router::new()
		.route("/region/{region_id}/", get(handle_region_orders))
		.route("/region/{region_id}", get(handle_region_orders))
		.route("/type/{type_id}/", get(handle_type_orders))
		.route("/type/{type_id}", get(handle_type_orders))
		.route("/region/{region_id}/type/{type_id}/", get(handle_region_type_orders))
		.route("/region/{region_id}/type/{type_id}", get(handle_region_type_orders));

	let sub_router = Router::new()
		.route("/hi", get(handle_hi))
		.nest("/orders/v1", orders_router)
		.layer(PropagateRequestIdLayer::new(x_request_id.clone())) //将请求id从请求头中传递到响应头中
		.layer(CompressionLayer::new())
		.layer(TimeoutLayer::new(request_timeout))
		.layer(TraceLayer::new_for_http())
		.layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid)) //生成请求id 并放到请求头中
		.layer(CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_credentials(false).allow_headers(Any).expose_headers(Any).max_age(Duration::from_secs(60) * 10))
		.with_state(state);

	Router::new().nest("/api", sub_router)
}
