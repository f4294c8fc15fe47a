// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Change-fetch API clients.
//!
//! The polling synchronizers talk to the remote change log through these
//! traits, so tests can substitute scripted fetchers for the HTTP
//! implementations.

use async_trait::async_trait;

use beacon_flags_core::{FetchOptions, FlagChangeBatch, SegmentChange, NO_CURSOR};

use crate::error::{FlagsError, Result};

/// Fetches one page of the flag change log from `since` forward.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlagChangeFetcher: Send + Sync {
	async fn fetch(&self, since: i64, options: FetchOptions) -> Result<FlagChangeBatch>;
}

/// Fetches one page of a named segment's change log from `since` forward.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SegmentChangeFetcher: Send + Sync {
	async fn fetch(&self, name: &str, since: i64, options: FetchOptions) -> Result<SegmentChange>;
}

/// HTTP implementation of [`FlagChangeFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFlagChangeFetcher {
	client: reqwest::Client,
	base_url: String,
	sdk_key: String,
}

impl HttpFlagChangeFetcher {
	pub fn new(client: reqwest::Client, base_url: impl Into<String>, sdk_key: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into(),
			sdk_key: sdk_key.into(),
		}
	}
}

#[async_trait]
impl FlagChangeFetcher for HttpFlagChangeFetcher {
	async fn fetch(&self, since: i64, options: FetchOptions) -> Result<FlagChangeBatch> {
		let mut request = self
			.client
			.get(format!("{}/splitChanges", self.base_url))
			.bearer_auth(&self.sdk_key)
			.query(&[("since", since)]);
		if options.target_change_number != NO_CURSOR {
			request = request.query(&[("till", options.target_change_number)]);
		}
		if options.cache_bypass {
			request = request.header("Cache-Control", "no-cache");
		}

		let response = request
			.send()
			.await
			.map_err(FlagsError::Fetch)?
			.error_for_status()
			.map_err(FlagsError::Fetch)?;
		response.json().await.map_err(FlagsError::FetchDecode)
	}
}

/// HTTP implementation of [`SegmentChangeFetcher`].
#[derive(Debug, Clone)]
pub struct HttpSegmentChangeFetcher {
	client: reqwest::Client,
	base_url: String,
	sdk_key: String,
}

impl HttpSegmentChangeFetcher {
	pub fn new(client: reqwest::Client, base_url: impl Into<String>, sdk_key: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into(),
			sdk_key: sdk_key.into(),
		}
	}
}

#[async_trait]
impl SegmentChangeFetcher for HttpSegmentChangeFetcher {
	async fn fetch(&self, name: &str, since: i64, options: FetchOptions) -> Result<SegmentChange> {
		let mut request = self
			.client
			.get(format!("{}/segmentChanges/{}", self.base_url, name))
			.bearer_auth(&self.sdk_key)
			.query(&[("since", since)]);
		if options.cache_bypass {
			request = request.header("Cache-Control", "no-cache");
		}

		let response = request
			.send()
			.await
			.map_err(FlagsError::Fetch)?
			.error_for_status()
			.map_err(FlagsError::Fetch)?;
		response.json().await.map_err(FlagsError::FetchDecode)
	}
}
