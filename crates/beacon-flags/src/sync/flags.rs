// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag polling synchronizer.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use beacon_flags_core::{FetchOptions, FlagDefinition, NO_CURSOR};

use crate::cache::VersionedCache;
use crate::fetch::FlagChangeFetcher;
use crate::gate::ReadinessGate;
use crate::sync::segments::SegmentCoordinator;

/// Periodic fetch loop advancing the flag change-log cursor.
///
/// There is exactly one of these per client. Push notifications land here
/// as a target cursor plus a wake-up; the loop then runs a bounded targeted
/// refresh instead of waiting for the next tick.
pub struct FlagSynchronizer {
	fetcher: Arc<dyn FlagChangeFetcher>,
	cache: Arc<VersionedCache>,
	gate: Arc<ReadinessGate>,
	segments: Arc<SegmentCoordinator>,
	target: AtomicI64,
	wake: Notify,
	shutdown: Notify,
	running: AtomicBool,
	task: Mutex<Option<JoinHandle<()>>>,
}

impl FlagSynchronizer {
	pub fn new(
		fetcher: Arc<dyn FlagChangeFetcher>,
		cache: Arc<VersionedCache>,
		gate: Arc<ReadinessGate>,
		segments: Arc<SegmentCoordinator>,
	) -> Self {
		Self {
			fetcher,
			cache,
			gate,
			segments,
			target: AtomicI64::new(NO_CURSOR),
			wake: Notify::new(),
			shutdown: Notify::new(),
			running: AtomicBool::new(false),
			task: Mutex::new(None),
		}
	}

	/// Starts the fixed-delay periodic fetch, first run immediate.
	pub fn start(self: &Arc<Self>, every: Duration) {
		if self.running.swap(true, Ordering::SeqCst) {
			warn!("flag synchronizer already running");
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
			debug!("flag synchronizer stopped");
		});
		*self.task_slot() = Some(handle);
	}

	/// Cancels the periodic timer. Never interrupts an in-flight fetch;
	/// idempotent.
	pub fn stop(&self) {
		if !self.running.swap(false, Ordering::SeqCst) {
			debug!("flag synchronizer not running");
			return;
		}
		self.shutdown.notify_one();
	}

	/// Records a push-announced change number and wakes the loop for a
	/// targeted refresh. Change numbers at or behind the cache are ignored.
	pub fn notify_change(&self, change_number: i64) {
		if change_number <= self.cache.flag_change_number() {
			debug!(change_number, "flag change already applied, ignored");
			return;
		}
		self.target.fetch_max(change_number, Ordering::SeqCst);
		self.wake.notify_one();
	}

	/// Target cursor not yet consumed by a targeted refresh.
	pub fn pending_target(&self) -> i64 {
		self.target.load(Ordering::SeqCst)
	}

	/// Pulls the change log forward from the cache's cursor until caught up.
	///
	/// Never fails: fetch and decode errors are logged and the cache is
	/// left at its last successfully-applied cursor. The one-shot cache
	/// bypass is carried only by the first request of the sequence; the
	/// caller's options value is never mutated.
	pub async fn force_refresh(&self, options: FetchOptions) {
		let mut page_options = options;
		loop {
			let since = self.cache.flag_change_number();
			let batch = match self.fetcher.fetch(since, page_options).await {
				Ok(batch) => batch,
				Err(e) => {
					warn!(error = %e, since, "flag fetch failed, cursor unchanged");
					return;
				}
			};
			if batch.since != since {
				debug!(
					expected = since,
					got = batch.since,
					"stale flag page discarded"
				);
				return;
			}
			self.apply(batch.flags);
			self.cache.set_flag_change_number(batch.till);
			if batch.till == batch.since {
				break;
			}
			page_options = page_options.consumed();
		}
		self.gate.record_flags_ready();
	}

	/// Full refresh ignoring any interim target cursor, used after a
	/// reconnect. Returns whether the cursor advanced.
	pub async fn fetch_all(&self, options: FetchOptions) -> bool {
		let before = self.cache.flag_change_number();
		let full = FetchOptions {
			cache_bypass: options.cache_bypass,
			target_change_number: NO_CURSOR,
		};
		self.force_refresh(full).await;
		self.cache.flag_change_number() != before
	}

	fn apply(&self, definitions: Vec<FlagDefinition>) {
		for definition in definitions {
			if let Err(e) = definition.validate() {
				// One bad entry never poisons the batch.
				warn!(error = %e, "flag entry dropped from this apply");
				continue;
			}
			for segment in definition.referenced_segments() {
				self.segments.ensure(segment);
			}
			self.cache.put_flag(definition);
		}
	}

	fn task_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
		self.task.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Drop for FlagSynchronizer {
	fn drop(&mut self) {
		if let Some(handle) = self.task_slot().take() {
			handle.abort();
		}
	}
}
