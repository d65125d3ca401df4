//! Settings store (C11): the application-layer cache in front of
//! `SettingsRepository`. The strategy engine reads a `Settings` snapshot
//! once per tick cycle rather than hitting the database per symbol;
//! `refresh()` is called by the scheduler on the same cadence as the
//! daily sync job so an operator's threshold change takes effect within
//! one sync cycle.

use crate::domain::repositories::SettingsRepository;
use crate::domain::settings::Settings;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub struct SettingsStore {
    repository: Arc<dyn SettingsRepository>,
    cached: RwLock<Settings>,
}

impl SettingsStore {
    pub async fn load(repository: Arc<dyn SettingsRepository>) -> Result<Self> {
        let rows = repository.list_all().await?;
        let cached = Settings::from_rows(&rows);
        Ok(Self {
            repository,
            cached: RwLock::new(cached),
        })
    }

    pub async fn current(&self) -> Settings {
        *self.cached.read().await
    }

    pub async fn refresh(&self) -> Result<()> {
        let rows = self.repository.list_all().await?;
        let settings = Settings::from_rows(&rows);
        *self.cached.write().await = settings;
        info!("settings store refreshed from persisted rows");
        Ok(())
    }
}
