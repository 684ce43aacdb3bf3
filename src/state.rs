use crate::achievements::StaticCatalog;
use crate::errors::AppError;
use crate::models::AppData;
use crate::sounds::SoundService;
use crate::storage::persist_data;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<AppData>>,
    pub catalog: Arc<StaticCatalog>,
    pub sounds: Arc<SoundService>,
    /// Set while the in-memory data holds changes the data file is missing.
    dirty: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        data_path: PathBuf,
        data: AppData,
        catalog: StaticCatalog,
        sounds: SoundService,
    ) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
            catalog: Arc::new(catalog),
            sounds: Arc::new(sounds),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Writes `data` when `changed` is set or an earlier write failed.
    /// Callers hold the data lock, so writes never interleave.
    pub async fn save(&self, data: &AppData, changed: bool) -> Result<(), AppError> {
        let retry = self.dirty.load(Ordering::Acquire);
        if !changed && !retry {
            return Ok(());
        }

        match persist_data(&self.data_path, data).await {
            Ok(()) => {
                if retry {
                    info!("data file caught up after an earlier write failure");
                }
                self.dirty.store(false, Ordering::Release);
                Ok(())
            }
            Err(err) => {
                error!("failed to write data file: {}", err.message);
                self.dirty.store(true, Ordering::Release);
                Err(err)
            }
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProgressRecord;
    use crate::storage::load_data;
    use crate::store::ProgressStore;
    use chrono::{TimeZone, Utc};
    use tokio::fs;

    #[tokio::test]
    async fn failed_write_is_retried_on_next_save() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("glow_journey_state_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir).await;
        let path = dir.join("state.json");

        let state = AppState::new(
            path.clone(),
            AppData::default(),
            StaticCatalog::builtin(),
            SoundService::builtin(),
        );
        let started = Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap();
        let mut data = state.data.lock().await;
        data.write(&ProgressRecord::new("u-1", started)).unwrap();

        assert!(state.save(&data, true).await.is_err());
        assert!(state.has_unsaved_changes());

        fs::create_dir_all(&dir).await.unwrap();
        state.save(&data, false).await.unwrap();
        assert!(!state.has_unsaved_changes());
        let stored = load_data(&path).await;
        assert_eq!(stored.read("u-1").unwrap(), data.read("u-1").unwrap());

        fs::remove_file(&path).await.unwrap();
        state.save(&data, false).await.unwrap();
        assert!(fs::metadata(&path).await.is_err());

        let _ = fs::remove_dir_all(&dir).await;
    }
}
