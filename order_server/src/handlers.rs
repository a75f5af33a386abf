use {
	crate::{error::QueryError, server::AppState},
	axum::{
		extract::{Path, State},
		http::header::CONTENT_TYPE,
		response::{IntoResponse, Response},
	},
};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// 合并后的数组已经是 json 文本 直接作为响应体
fn json_bytes(body: Vec<u8>) -> Response {
	([(CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response()
}

/// GET /api/orders/v1/region/{region_id}/
pub async fn handle_region_orders(State(state): State<AppState>, Path(region_id): Path<i64>) -> Result<Response, QueryError> {
	Ok(json_bytes(state.query.orders_by_region(region_id).await?))
}

/// GET /api/orders/v1/type/{type_id}/
pub async fn handle_type_orders(State(state): State<AppState>, Path(type_id): Path<i64>) -> Result<Response, QueryError> {
	Ok(json_bytes(state.query.orders_by_type(type_id).await?))
}

/// GET /api/orders/v1/region/{region_id}/type/{type_id}/
pub async fn handle_region_type_orders(State(state): State<AppState>, Path((region_id, type_id)): Path<(i64, i64)>) -> Result<Response, QueryError> {
	Ok(json_bytes(state.query.orders_by_region_and_type(region_id, type_id).await?))
}

pub async fn handle_hi() -> &'static str {
	"You will succeed."
}
