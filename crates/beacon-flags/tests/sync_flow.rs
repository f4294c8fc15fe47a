// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end synchronization against a mock backend.

use std::time::Duration;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use beacon_flags::{SyncConfig, SyncManager};

fn flag_json(name: &str, segment: Option<&str>, change_number: i64) -> serde_json::Value {
	let conditions = match segment {
		Some(segment) => serde_json::json!([{
			"matcherGroup": {
				"combiner": "AND",
				"matchers": [{"matcherType": "IN_SEGMENT", "segmentName": segment}],
			},
			"partitions": [{"treatment": "on", "size": 100}],
		}]),
		None => serde_json::json!([]),
	};
	serde_json::json!({
		"name": name,
		"status": "ACTIVE",
		"killed": false,
		"defaultTreatment": "off",
		"conditions": conditions,
		"trafficAllocationSeed": 1234,
		"changeNumber": change_number,
	})
}

async fn mock_backend() -> MockServer {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/splitChanges"))
		.and(query_param("since", "-1"))
		.and(header("authorization", "Bearer sdk-key-1"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"splits": [
				flag_json("checkout.redesign", Some("beta_users"), 100),
				flag_json("search.ranking", None, 90),
			],
			"since": -1,
			"till": 100,
		})))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/splitChanges"))
		.and(query_param("since", "100"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"splits": [],
			"since": 100,
			"till": 100,
		})))
		.mount(&server)
		.await;

	Mock::given(method("GET"))
		.and(path("/segmentChanges/beta_users"))
		.and(query_param("since", "-1"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"name": "beta_users",
			"added": ["alice", "bob"],
			"removed": [],
			"since": -1,
			"till": 42,
		})))
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/segmentChanges/beta_users"))
		.and(query_param("since", "42"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"name": "beta_users",
			"added": [],
			"removed": [],
			"since": 42,
			"till": 42,
		})))
		.mount(&server)
		.await;

	server
}

fn config_for(server: &MockServer) -> SyncConfig {
	let mut config = SyncConfig::new(
		server.uri(),
		format!("{}/api/v2/auth", server.uri()),
		format!("{}/sse", server.uri()),
		"sdk-key-1",
	);
	config.flags_refresh = Duration::from_millis(50);
	config.segments_refresh = Duration::from_millis(50);
	config.streaming_enabled = false;
	config
}

#[tokio::test]
async fn test_polling_reaches_readiness_and_populates_cache() {
	let server = mock_backend().await;
	let manager = SyncManager::new(config_for(&server));

	manager.start().await;
	assert!(manager.await_ready(Duration::from_secs(5)).await);

	let cache = manager.cache();
	assert_eq!(cache.flag_change_number(), 100);

	let flag = cache.get_flag("checkout.redesign").unwrap();
	assert_eq!(flag.change_number, 100);
	assert_eq!(flag.referenced_segments(), vec!["beta_users"]);

	assert!(cache.segment_contains("beta_users", "alice"));
	assert!(!cache.segment_contains("beta_users", "carol"));
	assert_eq!(cache.segment_change_number("beta_users"), 42);

	manager.stop();
}

#[tokio::test]
async fn test_push_disabled_by_auth_still_converges_by_polling() {
	let server = mock_backend().await;
	Mock::given(method("GET"))
		.and(path("/api/v2/auth"))
		.respond_with(
			ResponseTemplate::new(200).set_body_json(serde_json::json!({"pushEnabled": false})),
		)
		.mount(&server)
		.await;

	let mut config = config_for(&server);
	config.streaming_enabled = true;
	let manager = SyncManager::new(config);

	manager.start().await;
	assert!(manager.await_ready(Duration::from_secs(5)).await);
	assert!(!manager.is_streaming());
	assert!(manager.cache().get_flag("search.ranking").is_some());

	manager.stop();
}

#[tokio::test]
async fn test_await_ready_times_out_when_backend_is_down() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(500))
		.mount(&server)
		.await;

	let manager = SyncManager::new(config_for(&server));
	manager.start().await;

	assert!(!manager.await_ready(Duration::from_millis(300)).await);
	assert!(!manager.is_ready());
	// The cache stays readable and empty rather than poisoned.
	assert_eq!(manager.cache().flag_count(), 0);

	manager.stop();
}
