//! Disk-backed access-token cache. The broker issues a token valid for
//! roughly 24h; re-issuing on every process start would quickly exhaust
//! the daily issuance quota, so a successful token is mirrored to disk and
//! reloaded on the next start if still unexpired.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        // Leave a 5 minute margin so a near-expiry token isn't handed out
        // only to be rejected mid-request.
        now + chrono::Duration::minutes(5) < self.expires_at
    }
}

pub struct TokenCache {
    path: String,
}

impl TokenCache {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Option<CachedToken> {
        let contents = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<CachedToken>(&contents) {
            Ok(token) if token.is_valid(Utc::now()) => {
                debug!(path = %self.path, "loaded cached broker token");
                Some(token)
            }
            Ok(_) => {
                debug!(path = %self.path, "cached broker token expired");
                None
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "failed to parse cached broker token");
                None
            }
        }
    }

    pub async fn save(&self, token: &CachedToken) -> Result<()> {
        let json = serde_json::to_string(token)?;
        fs::write(&self.path, json)
            .await
            .context("failed to persist broker token cache")?;
        Ok(())
    }
}
