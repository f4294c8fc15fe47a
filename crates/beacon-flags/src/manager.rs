// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Top-level synchronization facade.
//!
//! Wires the cache, readiness gate, fetchers, synchronizers, dispatcher and
//! push manager together from one [`SyncConfig`]. Evaluation engines hold a
//! `SyncManager`, await readiness, and read the cache; they never see the
//! plumbing underneath.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::auth::AuthClient;
use crate::cache::VersionedCache;
use crate::config::SyncConfig;
use crate::dispatcher::NotificationDispatcher;
use crate::fetch::{HttpFlagChangeFetcher, HttpSegmentChangeFetcher};
use crate::gate::ReadinessGate;
use crate::push::PushManager;
use crate::sync::{FlagSynchronizer, SegmentCoordinator};
use crate::transport::StreamingTransport;

pub struct SyncManager {
	config: SyncConfig,
	cache: Arc<VersionedCache>,
	gate: Arc<ReadinessGate>,
	flags: Arc<FlagSynchronizer>,
	segments: Arc<SegmentCoordinator>,
	push: Arc<PushManager>,
	// Kept so the dispatcher outlives the transport's read loop.
	_dispatcher: Arc<NotificationDispatcher>,
}

impl SyncManager {
	pub fn new(config: SyncConfig) -> Self {
		let client = reqwest::Client::builder()
			.connect_timeout(config.connect_timeout)
			.build()
			.unwrap_or_else(|_| reqwest::Client::new());

		let cache = Arc::new(VersionedCache::new());
		let gate = Arc::new(ReadinessGate::new());

		let segments = Arc::new(SegmentCoordinator::new(
			Arc::new(HttpSegmentChangeFetcher::new(
				client.clone(),
				config.api_url.clone(),
				config.sdk_key.clone(),
			)),
			Arc::clone(&cache),
			Arc::clone(&gate),
			config.segments_refresh,
		));
		let flags = Arc::new(FlagSynchronizer::new(
			Arc::new(HttpFlagChangeFetcher::new(
				client.clone(),
				config.api_url.clone(),
				config.sdk_key.clone(),
			)),
			Arc::clone(&cache),
			Arc::clone(&gate),
			Arc::clone(&segments),
		));

		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let dispatcher = Arc::new(NotificationDispatcher::new(
			Arc::clone(&flags),
			Arc::clone(&segments),
			Arc::clone(&cache),
			events_tx,
		));
		let transport = Arc::new(StreamingTransport::new(
			client.clone(),
			Arc::clone(&dispatcher) as _,
			config.connect_timeout,
		));
		let push = PushManager::new(
			AuthClient::new(client, config.auth_url.clone(), config.sdk_key.clone()),
			transport,
			Arc::clone(&flags),
			Arc::clone(&segments),
			config.stream_url.clone(),
			config.auth_retry_backoff,
			events_rx,
		);

		Self {
			config,
			cache,
			gate,
			flags,
			segments,
			push,
			_dispatcher: dispatcher,
		}
	}

	/// Begins polling, and the push path when enabled. Idempotent at the
	/// component level; a second call is a set of logged no-ops.
	pub async fn start(&self) {
		info!(
			streaming = self.config.streaming_enabled,
			"synchronization starting"
		);
		self.flags.start(self.config.flags_refresh);
		self.segments.start();
		if self.config.streaming_enabled {
			self.push.start().await;
		}
	}

	/// Tears down push and polling. The cache keeps its last consistent
	/// contents and stays readable.
	pub fn stop(&self) {
		info!("synchronization stopping");
		self.push.stop();
		self.flags.stop();
		self.segments.stop();
	}

	pub fn cache(&self) -> &Arc<VersionedCache> {
		&self.cache
	}

	pub fn is_ready(&self) -> bool {
		self.gate.is_ready()
	}

	/// Blocks until flags and every registered segment have synchronized
	/// once, or the timeout elapses. Returns whether readiness was reached.
	pub async fn await_ready(&self, timeout: Duration) -> bool {
		self.gate.await_ready(timeout).await
	}

	pub fn is_streaming(&self) -> bool {
		self.push.is_streaming()
	}
}

impl Drop for SyncManager {
	fn drop(&mut self) {
		self.stop();
	}
}
