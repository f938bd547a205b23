use crate::errors::AppError;
use crate::interaction::Theme;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use tracing::{error, warn};

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Preferences {
    entries: BTreeMap<String, String>,
}

impl Preferences {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn theme(&self) -> Theme {
        match self.get(THEME_KEY).map(str::parse::<Theme>) {
            Some(Ok(theme)) => theme,
            Some(Err(err)) => {
                warn!("ignoring stored theme: {err}");
                Theme::default()
            }
            None => Theme::default(),
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.set(THEME_KEY, theme.as_str());
    }
}

pub async fn load_preferences(path: &Path) -> Preferences {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(prefs) => prefs,
            Err(err) => {
                error!("failed to parse preferences file: {err}");
                Preferences::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
        Err(err) => {
            error!("failed to read preferences file: {err}");
            Preferences::default()
        }
    }
}

pub async fn persist_preferences(path: &Path, prefs: &Preferences) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(prefs).map_err(AppError::internal)?;
    fs::write(path, payload).await?;
    Ok(())
}
