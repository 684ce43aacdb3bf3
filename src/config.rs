use crate::storage::resolve_data_path;
use std::{env, path::PathBuf};
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    /// Replaces the built-in achievement catalog when set.
    pub achievements_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, std::io::Error> {
        let port = match env::var("PORT") {
            Ok(value) => value.parse::<u16>().unwrap_or_else(|_| {
                warn!("invalid PORT {value:?}, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let achievements_path = env::var("ACHIEVEMENTS_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            port,
            data_path: resolve_data_path()?,
            achievements_path,
        })
    }
}
