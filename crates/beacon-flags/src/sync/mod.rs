// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Polling synchronizers.
//!
//! Each resource type has a periodic fetch loop that pulls change-log pages
//! forward from the cache's cursor: one loop for flags, one per named
//! segment. The loops are the sole update path when streaming is down, and
//! the landing point for push-triggered targeted refreshes.

pub mod flags;
pub mod segments;

pub use flags::FlagSynchronizer;
pub use segments::{SegmentCoordinator, SegmentWorker};
