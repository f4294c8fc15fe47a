// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Streaming transport for push notifications.
//!
//! Owns one physical streaming connection and its read-loop task. The
//! transport frames blank-line-delimited messages and reports connection
//! outcomes to a [`StreamObserver`]; it performs no decoding beyond framing
//! and keep-alive filtering.
//!
//! Failure classification drives the caller's retry decision: a 4xx on
//! connect means the access token is no longer good and reconnecting
//! requires fresh authentication; everything else transient is retryable;
//! a local `close()` is reported as a forced stop and must not be retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use beacon_flags_core::{StreamFrame, KEEP_ALIVE_PAYLOAD};

/// Connection lifecycle outcomes reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
	/// First contact succeeded; the read loop is running.
	Connected,
	/// Transient failure: I/O error, 5xx, or unexpected EOF. The caller may
	/// reconnect.
	RetryableError,
	/// The endpoint rejected the connection (4xx). Reconnecting requires
	/// fresh authentication.
	NonRetryableError,
	/// The read loop was interrupted by a local `close()`. Not a failure;
	/// the caller must not retry.
	ForcedStop,
}

/// Handler capability for stream consumers.
///
/// Implementations must not block: `on_message` runs on the read-loop task,
/// and a slow handler stalls stream consumption.
pub trait StreamObserver: Send + Sync {
	fn on_message(&self, frame: StreamFrame);
	fn on_status_change(&self, status: StreamStatus);
}

#[derive(Debug, Default)]
struct Shared {
	open: AtomicBool,
	shutdown: Notify,
}

#[derive(Default)]
struct Connection {
	shared: Arc<Shared>,
	task: Option<JoinHandle<()>>,
}

/// One streaming connection with a dedicated read-loop task.
pub struct StreamingTransport {
	client: reqwest::Client,
	observer: Arc<dyn StreamObserver>,
	connect_timeout: Duration,
	// Replaced wholesale on every open, so a read loop winding down from a
	// previous connection can only ever touch its own state.
	conn: Mutex<Connection>,
}

impl StreamingTransport {
	pub fn new(
		client: reqwest::Client,
		observer: Arc<dyn StreamObserver>,
		connect_timeout: Duration,
	) -> Self {
		Self {
			client,
			observer,
			connect_timeout,
			conn: Mutex::new(Connection::default()),
		}
	}

	/// Opens the connection and launches the read loop.
	///
	/// Suspends the caller only until first contact (response headers) or
	/// the connect timeout, never for the life of the stream. Returns
	/// whether the connection reached the open state.
	pub async fn open(&self, url: String) -> bool {
		if self.is_open() {
			warn!("streaming transport already open");
			return false;
		}

		let (first_contact_tx, first_contact_rx) = oneshot::channel();
		let shared = Arc::new(Shared::default());
		let observer = Arc::clone(&self.observer);
		let client = self.client.clone();

		let loop_shared = Arc::clone(&shared);
		let handle = tokio::spawn(async move {
			read_loop(client, url, loop_shared, observer, first_contact_tx).await;
		});
		{
			let mut conn = self.conn_slot();
			conn.shared = shared;
			if let Some(previous) = conn.task.replace(handle) {
				previous.abort();
			}
		}

		if tokio::time::timeout(self.connect_timeout, first_contact_rx)
			.await
			.is_err()
		{
			warn!(
				timeout_ms = self.connect_timeout.as_millis(),
				"timed out awaiting streaming first contact"
			);
		}
		self.is_open()
	}

	pub fn is_open(&self) -> bool {
		self.conn_slot().shared.open.load(Ordering::SeqCst)
	}

	/// Interrupts the read loop. Idempotent: closing a closed transport is
	/// a logged no-op.
	pub fn close(&self) {
		let shared = Arc::clone(&self.conn_slot().shared);
		if !shared.open.swap(false, Ordering::SeqCst) {
			debug!("streaming transport already closed");
			return;
		}
		shared.shutdown.notify_one();
	}

	fn conn_slot(&self) -> std::sync::MutexGuard<'_, Connection> {
		self.conn.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl Drop for StreamingTransport {
	fn drop(&mut self) {
		if let Some(handle) = self.conn_slot().task.take() {
			handle.abort();
		}
	}
}

async fn read_loop(
	client: reqwest::Client,
	url: String,
	shared: Arc<Shared>,
	observer: Arc<dyn StreamObserver>,
	first_contact: oneshot::Sender<()>,
) {
	let response = match client
		.get(&url)
		.header("Accept", "text/event-stream")
		.header("Cache-Control", "no-cache")
		.send()
		.await
	{
		Ok(response) => response,
		Err(e) => {
			warn!(error = %e, "streaming connection attempt failed");
			let _ = first_contact.send(());
			observer.on_status_change(StreamStatus::RetryableError);
			return;
		}
	};

	let status = response.status();
	if !status.is_success() {
		warn!(status = status.as_u16(), "streaming endpoint refused connection");
		let _ = first_contact.send(());
		if status.is_client_error() {
			observer.on_status_change(StreamStatus::NonRetryableError);
		} else {
			observer.on_status_change(StreamStatus::RetryableError);
		}
		return;
	}

	shared.open.store(true, Ordering::SeqCst);
	let _ = first_contact.send(());
	info!("streaming connection established");
	observer.on_status_change(StreamStatus::Connected);

	let mut stream = response.bytes_stream();
	let mut buffer = String::new();

	loop {
		tokio::select! {
			_ = shared.shutdown.notified() => {
				debug!("streaming transport closed locally");
				observer.on_status_change(StreamStatus::ForcedStop);
				break;
			}
			chunk = stream.next() => match chunk {
				Some(Ok(bytes)) => {
					buffer.push_str(&String::from_utf8_lossy(&bytes).replace('\r', ""));
					while let Some(boundary) = buffer.find("\n\n") {
						let raw: String = buffer.drain(..boundary + 2).collect();
						handle_frame(raw.trim_end_matches('\n'), &observer);
					}
				}
				Some(Err(e)) => {
					warn!(error = %e, "streaming read failed");
					observer.on_status_change(StreamStatus::RetryableError);
					break;
				}
				None => {
					// EOF with a partial frame buffered is a framing error;
					// either way the server is gone and a reconnect is due.
					if buffer.is_empty() {
						warn!("streaming connection closed by remote host");
					} else {
						warn!("streaming connection ended mid-frame");
					}
					observer.on_status_change(StreamStatus::RetryableError);
					break;
				}
			}
		}
	}

	// Dropping the stream releases the connection on every exit path.
	shared.open.store(false, Ordering::SeqCst);
	debug!("streaming read loop finished");
}

fn handle_frame(raw: &str, observer: &Arc<dyn StreamObserver>) {
	if raw.is_empty() || raw == KEEP_ALIVE_PAYLOAD {
		debug!("keep-alive frame");
		return;
	}
	let frame = StreamFrame::parse(raw);
	if frame.is_empty() {
		debug!("frame without data discarded");
		return;
	}
	observer.on_message(frame);
}
