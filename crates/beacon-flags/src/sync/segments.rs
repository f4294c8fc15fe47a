// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Segment polling synchronizers.
//!
//! Segments are discovered lazily: the first reference to a name (from a
//! flag definition's conditions or a push notification) creates that
//! segment's worker through an atomic insert-if-absent, so concurrent first
//! requesters always receive the identical instance.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use beacon_flags_core::{FetchOptions, NO_CURSOR};

use crate::cache::VersionedCache;
use crate::fetch::SegmentChangeFetcher;
use crate::gate::ReadinessGate;

/// Periodic fetch loop for one named segment.
pub struct SegmentWorker {
	name: String,
	fetcher: Arc<dyn SegmentChangeFetcher>,
	cache: Arc<VersionedCache>,
	gate: Arc<ReadinessGate>,
	target: AtomicI64,
	wake: Notify,
	shutdown: Notify,
	running: AtomicBool,
	task: Mutex<Option<JoinHandle<()>>>,
}

impl SegmentWorker {
	fn new(
		name: String,
		fetcher: Arc<dyn SegmentChangeFetcher>,
		cache: Arc<VersionedCache>,
		gate: Arc<ReadinessGate>,
	) -> Self {
		Self {
			name,
			fetcher,
			cache,
			gate,
			target: AtomicI64::new(NO_CURSOR),
			wake: Notify::new(),
			shutdown: Notify::new(),
			running: AtomicBool::new(false),
			task: Mutex::new(None),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	fn start(self: &Arc<Self>, every: Duration) {
		if self.running.swap(true, Ordering::SeqCst) {
			return;
		}
		let me = Arc::clone(self);
		let handle = tokio::spawn(async move {
			let mut timer = tokio::time::interval(every);
			timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
			loop {
				tokio::select! {
					_ = me.shutdown.notified() => break,
					_ = timer.tick() => {
						me.force_refresh(FetchOptions::new()).await;
					}
					_ = me.wake.notified() => {
						let target = me.target.swap(NO_CURSOR, Ordering::SeqCst);
						me.force_refresh(FetchOptions::with_target(target)).await;
					}
				}
			}
			debug!(segment = %me.name, "segment worker stopped");
		});
		*self.task_slot() = Some(handle);
	}

	/// Cancels the periodic timer without interrupting an in-flight fetch.
	pub fn stop(&self) {
		if !self.running.swap(false, Ordering::SeqCst) {
			return;
		}
		self.shutdown.notify_one();
	}

	/// Records a push-announced change number and wakes the loop.
	pub fn notify_change(&self, change_number: i64) {
		if change_number <= self.cache.segment_change_number(&self.name) {
			debug!(
				segment = %self.name,
				change_number,
				"segment change already applied, ignored"
			);
			return;
		}
		self.target.fetch_max(change_number, Ordering::SeqCst);
		self.wake.notify_one();
	}

	/// Pulls this segment's change log forward until caught up. Never
	/// fails; errors leave the membership at its last applied cursor.
	pub async fn force_refresh(&self, options: FetchOptions) {
		let mut page_options = options;
		loop {
			let since = self.cache.segment_change_number(&self.name);
			let change = match self.fetcher.fetch(&self.name, since, page_options).await {
				Ok(change) => change,
				Err(e) => {
					warn!(
						segment = %self.name,
						error = %e,
						since,
						"segment fetch failed, cursor unchanged"
					);
					return;
				}
			};
			if !self.cache.apply_segment_delta(&change) {
				return;
			}
			if !change.has_more() {
				break;
			}
			page_options = page_options.consumed();
		}
		self.gate.record_segment_ready(&self.name);
	}

	/// Full refresh ignoring any interim target. Returns whether the
	/// cursor advanced.
	pub async fn fetch_all(&self, options: FetchOptions) -> bool {
		let before = self.cache.segment_change_number(&self.name);
		let full = FetchOptions {
			cache_bypass: options.cache_bypass,
			target_change_number: NO_CURSOR,
		};
		self.force_refresh(full).await;
		self.cache.segment_change_number(&self.name) != before
	}

	fn task_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
		self.task.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Drop for SegmentWorker {
	fn drop(&mut self) {
		if let Some(handle) = self.task_slot().take() {
			handle.abort();
		}
	}
}

/// Lazily creates and owns one [`SegmentWorker`] per referenced segment.
pub struct SegmentCoordinator {
	fetcher: Arc<dyn SegmentChangeFetcher>,
	cache: Arc<VersionedCache>,
	gate: Arc<ReadinessGate>,
	refresh_every: Duration,
	workers: DashMap<String, Arc<SegmentWorker>>,
	running: AtomicBool,
}

impl SegmentCoordinator {
	pub fn new(
		fetcher: Arc<dyn SegmentChangeFetcher>,
		cache: Arc<VersionedCache>,
		gate: Arc<ReadinessGate>,
		refresh_every: Duration,
	) -> Self {
		Self {
			fetcher,
			cache,
			gate,
			refresh_every,
			workers: DashMap::new(),
			running: AtomicBool::new(false),
		}
	}

	/// Returns the singleton worker for a segment, creating it on first
	/// reference. Registration with the readiness gate happens inside the
	/// creating insert, before any fetch can complete.
	pub fn ensure(&self, name: &str) -> Arc<SegmentWorker> {
		let worker = self
			.workers
			.entry(name.to_string())
			.or_insert_with(|| {
				debug!(segment = name, "segment worker created");
				self.gate.register_segment(name);
				Arc::new(SegmentWorker::new(
					name.to_string(),
					Arc::clone(&self.fetcher),
					Arc::clone(&self.cache),
					Arc::clone(&self.gate),
				))
			})
			.clone();
		if self.running.load(Ordering::SeqCst) {
			worker.start(self.refresh_every);
		}
		worker
	}

	/// Routes a push-announced segment change to that segment's worker,
	/// creating it on demand.
	pub fn notify_change(&self, name: &str, change_number: i64) {
		self.ensure(name).notify_change(change_number);
	}

	/// Starts periodic fetching for every known worker; later-created
	/// workers start as they appear.
	pub fn start(&self) {
		if self.running.swap(true, Ordering::SeqCst) {
			warn!("segment coordinator already running");
			return;
		}
		for entry in self.workers.iter() {
			entry.value().start(self.refresh_every);
		}
	}

	/// Stops every worker's timer; idempotent.
	pub fn stop(&self) {
		if !self.running.swap(false, Ordering::SeqCst) {
			debug!("segment coordinator not running");
			return;
		}
		for entry in self.workers.iter() {
			entry.value().stop();
		}
	}

	/// Refreshes every known segment. Returns whether any cursor advanced.
	pub async fn fetch_all(&self, options: FetchOptions) -> bool {
		let workers: Vec<Arc<SegmentWorker>> =
			self.workers.iter().map(|entry| entry.value().clone()).collect();
		let mut any = false;
		for worker in workers {
			any |= worker.fetch_all(options).await;
		}
		any
	}

	pub fn worker_count(&self) -> usize {
		self.workers.len()
	}
}
