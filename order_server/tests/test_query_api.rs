mod test_utils;

use {
	axum::http::{StatusCode, header::CONTENT_TYPE},
	common::{codec, market_types::MarketKey},
	test_utils::*,
};

#[tokio::test]
async fn test_ingest_then_get_region_type() {
	let store = MemorySnapshotStore::new();
	let delivery = RecordingDelivery::new(r#"{"regionID":10000002,"typeID":34,"orders":[{"price":5.5}]}"#);
	pipeline(&store).handle(&delivery).await;

	let (status, headers, body) = get(test_app(&store), "/api/orders/v1/region/10000002/type/34/").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, br#"[{"price":5.5}]"#);
	assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json; charset=utf-8");
	assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
}

#[tokio::test]
async fn test_get_type_merges_regions() {
	let store = MemorySnapshotStore::new();
	let pipeline = pipeline(&store);
	pipeline.ingest(market_body(1, 34, r#"[{"orderID":11}]"#).as_bytes()).await.unwrap();
	pipeline.ingest(market_body(2, 34, r#"[{"orderID":22}]"#).as_bytes()).await.unwrap();
	pipeline.ingest(market_body(2, 35, r#"[{"orderID":33}]"#).as_bytes()).await.unwrap();

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/type/34/").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(sorted_elements(&body), vec![r#"{"orderID":11}"#, r#"{"orderID":22}"#]);
}

#[tokio::test]
async fn test_get_region_merges_types() {
	let store = MemorySnapshotStore::new();
	let pipeline = pipeline(&store);
	pipeline.ingest(market_body(10000002, 34, r#"[{"orderID":1},{"orderID":2}]"#).as_bytes()).await.unwrap();
	pipeline.ingest(market_body(10000002, 35, r#"[{"orderID":3}]"#).as_bytes()).await.unwrap();
	pipeline.ingest(market_body(10000043, 34, r#"[{"orderID":4}]"#).as_bytes()).await.unwrap();

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/region/10000002/").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(sorted_elements(&body), vec![r#"{"orderID":1}"#, r#"{"orderID":2}"#, r#"{"orderID":3}"#]);
}

#[tokio::test]
async fn test_unknown_pair_is_not_found() {
	let store = MemorySnapshotStore::new();
	pipeline(&store).ingest(market_body(1, 34, "[]").as_bytes()).await.unwrap();

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/region/1/type/35/").await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert!(body.is_empty());
}

#[tokio::test]
async fn test_empty_range_returns_empty_array() {
	let store = MemorySnapshotStore::new();

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/region/99/").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, b"[]");

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/type/99/").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_existing_pair_with_empty_orders() {
	let store = MemorySnapshotStore::new();
	pipeline(&store).ingest(market_body(1, 34, "[]").as_bytes()).await.unwrap();

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/region/1/type/34/").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, b"[]");
}

#[tokio::test]
async fn test_one_bad_row_fails_whole_range() {
	let store = MemorySnapshotStore::new();
	pipeline(&store).ingest(market_body(1, 34, r#"[{"orderID":1}]"#).as_bytes()).await.unwrap();
	// 旧数据里没有 orders
	lazy_pipeline(&store).ingest(br#"{"regionID":2,"typeID":34}"#).await.unwrap();

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/type/34/").await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert!(body.is_empty());

	// 其他 type 不受影响
	let (status, _, body) = get(test_app(&store), "/api/orders/v1/region/1/").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, br#"[{"orderID":1}]"#);
}

#[tokio::test]
async fn test_undecodable_row_is_not_found() {
	let store = MemorySnapshotStore::new();
	store.put_raw(MarketKey::new(1, 34), market_body(1, 34, "[]").into_bytes());

	let (status, _, _) = get(test_app(&store), "/api/orders/v1/region/1/type/34/").await;

	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_error_is_server_fault() {
	let store = MemorySnapshotStore::new();
	store.put_raw(MarketKey::new(1, 34), codec::compress(market_body(1, 34, "[]").as_bytes()).unwrap());
	store.set_fail_reads(true);

	for uri in ["/api/orders/v1/region/1/", "/api/orders/v1/type/34/", "/api/orders/v1/region/1/type/34/"] {
		let (status, headers, _) = get(test_app(&store), uri).await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
		assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
	}
}

#[tokio::test]
async fn test_non_integer_id_is_bad_request() {
	let store = MemorySnapshotStore::new();

	for uri in ["/api/orders/v1/region/abc/", "/api/orders/v1/type/1.5/", "/api/orders/v1/region/1/type/99999999999999999999/"] {
		let (status, _, _) = get(test_app(&store), uri).await;
		assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
	}
}

#[tokio::test]
async fn test_routes_without_trailing_slash() {
	let store = MemorySnapshotStore::new();
	pipeline(&store).ingest(market_body(1, 34, "[7]").as_bytes()).await.unwrap();

	let (status, _, body) = get(test_app(&store), "/api/orders/v1/region/1/type/34").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, b"[7]");
}

#[tokio::test]
async fn test_hi() {
	let store = MemorySnapshotStore::new();
	let (status, _, body) = get(test_app(&store), "/api/hi").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, b"You will succeed.");
}
