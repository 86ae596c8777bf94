use crate::payload::{parse_fallback, parse_primary};
use chrono::Utc;
use holdwatch_core::{HoldError, Origin, Reading, Result};
use std::future::Future;
use tracing::{debug, warn};

/// Anything that can produce a holder-count reading.
///
/// No timeout is applied on top of the transport's own defaults, so a hung
/// upstream delays the caller for as long as the transport allows.
pub trait HolderSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Reading>> + Send;
}

/// Client for the backend's `GET /api/holders`.
#[derive(Debug, Clone)]
pub struct PrimarySource {
    client: reqwest::Client,
    url:    String,
}

impl PrimarySource {
    /// `backend_url` is the base, e.g. `http://localhost:3001`.
    pub fn new(client: reqwest::Client, backend_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/api/holders", backend_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HolderSource for PrimarySource {
    async fn fetch(&self) -> Result<Reading> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| HoldError::Source(format!("GET {}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HoldError::Source(format!("GET {} returned {status}", self.url)));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| HoldError::Source(format!("read body: {e}")))?;

        parse_primary(&body, Utc::now())
    }
}

/// Token-metadata lookup keyed by a fixed mint address.
#[derive(Debug, Clone)]
pub struct FallbackSource {
    client: reqwest::Client,
    url:    String,
    mint:   String,
}

impl FallbackSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, mint: impl Into<String>) -> Self {
        Self {
            client,
            url:  url.into(),
            mint: mint.into(),
        }
    }

    /// A fallback with no URL configured always fails.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

impl HolderSource for FallbackSource {
    async fn fetch(&self) -> Result<Reading> {
        if !self.is_configured() {
            return Err(HoldError::Config("fallback source not configured".into()));
        }

        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "mintAccounts": [self.mint] }))
            .send()
            .await
            .map_err(|e| HoldError::Source(format!("POST token-metadata: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HoldError::Source(format!("token-metadata returned {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| HoldError::Source(format!("read body: {e}")))?;

        parse_fallback(&body, Utc::now())
    }
}

/// Primary source with a fallback.  Any primary error (transport, status,
/// invalid payload) switches to the fallback, whose reading is tagged
/// [`Origin::Fallback`].
#[derive(Debug, Clone)]
pub struct FallbackChain<P, F> {
    primary:  P,
    fallback: F,
}

impl<P: HolderSource, F: HolderSource> FallbackChain<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: HolderSource, F: HolderSource> HolderSource for FallbackChain<P, F> {
    async fn fetch(&self) -> Result<Reading> {
        let primary_err = match self.primary.fetch().await {
            Ok(reading) => return Ok(reading),
            Err(e) => e,
        };
        warn!("Primary holder source failed: {primary_err}; trying fallback");

        match self.fallback.fetch().await {
            Ok(mut reading) => {
                debug!("Fallback returned {} holders", reading.holders);
                reading.origin = Origin::Fallback;
                Ok(reading)
            }
            Err(fallback_err) => Err(HoldError::Source(format!(
                "all sources failed (primary: {primary_err}; fallback: {fallback_err})"
            ))),
        }
    }
}
