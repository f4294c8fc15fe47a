// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flag synchronization client for Beacon.
//!
//! This crate keeps a local, versioned view of flag definitions and segment
//! memberships converged with the Beacon backend. It layers a push channel
//! (streamed change notifications) over baseline polling, so evaluation
//! engines always read from an in-memory cache that is at worst briefly
//! stale, never inconsistent.
//!
//! # Architecture
//!
//! - **Cache**: concurrent flag/segment store with monotonic change cursors
//! - **Readiness gate**: blocks callers until the first sync completes
//! - **Polling synchronizers**: periodic change-log fetches, one task for
//!   flags and one per referenced segment
//! - **Streaming transport + dispatcher**: long-lived notification stream
//!   whose messages wake the synchronizers with bounded, targeted fetches
//! - **Push manager**: authentication, token refresh, and fallback to
//!   polling whenever streaming degrades
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use beacon_flags::{SyncConfig, SyncManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SyncConfig::new(
//!         "https://beacon.example.com/api",
//!         "https://beacon.example.com/api/v2/auth",
//!         "https://streaming.example.com/sse",
//!         "beacon_sdk_server_prod_xxx",
//!     );
//!     let manager = SyncManager::new(config);
//!     manager.start().await;
//!
//!     if manager.await_ready(Duration::from_secs(10)).await {
//!         if let Some(flag) = manager.cache().get_flag("feature.new_flow") {
//!             println!("{} -> {}", flag.name, flag.default_treatment);
//!         }
//!     }
//!
//!     manager.stop();
//! }
//! ```

mod auth;
mod cache;
mod config;
mod dispatcher;
mod error;
mod fetch;
mod gate;
mod manager;
mod push;
mod sync;
mod transport;

pub use auth::{AuthClient, AuthResult};
pub use cache::VersionedCache;
pub use config::SyncConfig;
pub use dispatcher::{NotificationDispatcher, PushEvent};
pub use error::{FlagsError, Result};
pub use fetch::{
	FlagChangeFetcher, HttpFlagChangeFetcher, HttpSegmentChangeFetcher, SegmentChangeFetcher,
};
pub use gate::ReadinessGate;
pub use manager::SyncManager;
pub use push::PushManager;
pub use sync::{FlagSynchronizer, SegmentCoordinator, SegmentWorker};
pub use transport::{StreamObserver, StreamStatus, StreamingTransport};

// Re-export core wire types for convenience
pub use beacon_flags_core::{
	AuthPayload, Condition, ControlType, FetchOptions, FlagChangeBatch, FlagDefinition, FlagStatus,
	Matcher, MatcherGroup, Notification, NotificationEnvelope, OccupancyMetrics, Partition,
	SegmentChange, SegmentMembership, StreamFrame, NO_CURSOR,
};
