// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Readiness gate tracking first-sync convergence.
//!
//! Callers must not evaluate against the cache until every resource has
//! completed at least one successful fetch. The gate counts those first
//! completions and exposes suspending waits with a timeout. Readiness is a
//! ratchet: once reached it never reverts, no matter what later fetches do.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Default)]
struct SegmentLedger {
	registered: HashSet<String>,
	pending: HashSet<String>,
}

/// Tracks which resources have completed their first successful fetch.
#[derive(Debug, Default)]
pub struct ReadinessGate {
	flags_ready: AtomicBool,
	ready: AtomicBool,
	segments: Mutex<SegmentLedger>,
	notify: Notify,
}

impl ReadinessGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records that the flag synchronizer completed its first fetch.
	pub fn record_flags_ready(&self) {
		if !self.flags_ready.swap(true, Ordering::SeqCst) {
			debug!("flags ready");
		}
		self.maybe_ratchet();
	}

	/// Registers a segment the gate must wait for. Must happen before that
	/// segment's first successful fetch.
	pub fn register_segment(&self, name: &str) {
		let mut ledger = self.ledger();
		if ledger.registered.insert(name.to_string()) {
			ledger.pending.insert(name.to_string());
			debug!(segment = name, "segment registered");
		}
	}

	/// Records a segment's first successful fetch. A no-op for segments
	/// that were never registered.
	pub fn record_segment_ready(&self, name: &str) {
		{
			let mut ledger = self.ledger();
			if !ledger.registered.contains(name) {
				debug!(segment = name, "readiness for unregistered segment ignored");
				return;
			}
			ledger.pending.remove(name);
		}
		self.maybe_ratchet();
	}

	pub fn flags_ready(&self) -> bool {
		self.flags_ready.load(Ordering::SeqCst)
	}

	pub fn segments_ready(&self) -> bool {
		self.ledger().pending.is_empty()
	}

	/// Whether the gate has (ever) been fully open.
	pub fn is_ready(&self) -> bool {
		self.ready.load(Ordering::SeqCst)
	}

	/// Suspends until the flag synchronizer is ready, or the timeout lapses.
	pub async fn await_flags_ready(&self, timeout: Duration) -> bool {
		self.await_condition(timeout, || self.flags_ready()).await
	}

	/// Suspends until every registered segment is ready, or the timeout
	/// lapses.
	pub async fn await_segments_ready(&self, timeout: Duration) -> bool {
		self.await_condition(timeout, || self.segments_ready()).await
	}

	/// Suspends until the gate is fully open, or the timeout lapses.
	pub async fn await_ready(&self, timeout: Duration) -> bool {
		self.await_condition(timeout, || self.is_ready()).await
	}

	async fn await_condition(&self, timeout: Duration, condition: impl Fn() -> bool) -> bool {
		tokio::time::timeout(timeout, async {
			loop {
				// Arm the waiter before checking, so a recording that lands
				// between the check and the await is not lost.
				let notified = self.notify.notified();
				if condition() {
					return;
				}
				notified.await;
			}
		})
		.await
		.is_ok()
	}

	fn maybe_ratchet(&self) {
		if self.flags_ready() && self.segments_ready() {
			self.ready.store(true, Ordering::SeqCst);
		}
		self.notify.notify_waiters();
	}

	fn ledger(&self) -> std::sync::MutexGuard<'_, SegmentLedger> {
		self.segments.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
