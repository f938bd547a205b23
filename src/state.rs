use crate::config::Config;
use crate::errors::{AppError, FetchError};
use crate::fetcher::fetch_all;
use crate::interaction::Theme;
use crate::models::Dataset;
use crate::storage::{Preferences, persist_preferences};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

/// The installed dataset and the fetch cycle that produced it. Generation 0
/// is the empty dataset present before the first successful fetch.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub generation: u64,
    pub dataset: Arc<Dataset>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    preferences: Arc<Mutex<Preferences>>,
    snapshot: Arc<RwLock<Snapshot>>,
    issued: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: Config, preferences: Preferences) -> Self {
        Self {
            config: Arc::new(config),
            client: reqwest::Client::new(),
            preferences: Arc::new(Mutex::new(preferences)),
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
            issued: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Runs one fetch cycle. On failure the installed dataset is left alone.
    pub async fn refresh(&self) -> Result<Snapshot, FetchError> {
        let generation = self.begin_cycle();
        info!(generation, "fetch cycle started");

        match fetch_all(&self.client, &self.config.endpoints).await {
            Ok(dataset) => {
                info!(
                    generation,
                    users = dataset.users.len(),
                    sessions = dataset.sessions.len(),
                    attendance = dataset.attendance.len(),
                    "fetch cycle finished"
                );
                self.install(generation, dataset).await;
                Ok(self.snapshot().await)
            }
            Err(err) => {
                error!(generation, "fetch cycle failed: {err}");
                Err(err)
            }
        }
    }

    pub fn begin_cycle(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Installs `dataset` unless a later cycle already installed its own.
    pub async fn install(&self, generation: u64, dataset: Dataset) -> bool {
        let mut current = self.snapshot.write().await;
        if generation <= current.generation {
            warn!(
                generation,
                installed = current.generation,
                "dropping result of superseded fetch cycle"
            );
            return false;
        }
        *current = Snapshot {
            generation,
            dataset: Arc::new(dataset),
        };
        true
    }

    pub async fn theme(&self) -> Theme {
        self.preferences.lock().await.theme()
    }

    /// Flips the theme. Memory only changes once the write has succeeded.
    pub async fn toggle_theme(&self) -> Result<Theme, AppError> {
        let mut prefs = self.preferences.lock().await;
        let theme = prefs.theme().toggled();
        let mut next = prefs.clone();
        next.set_theme(theme);
        persist_preferences(&self.config.data_path, &next).await?;
        *prefs = next;
        info!(theme = theme.as_str(), "theme changed");
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;

    fn state(data_path: std::path::PathBuf) -> AppState {
        let config = Config {
            data_path,
            ..Config::from_lookup(|_| None)
        };
        AppState::new(config, Preferences::default())
    }

    fn dataset_with_sessions(n: usize) -> Dataset {
        Dataset {
            sessions: vec![Session::default(); n],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn newer_cycle_wins_over_late_response() {
        let state = state("unused.json".into());
        let first = state.begin_cycle();
        let second = state.begin_cycle();

        assert!(state.install(second, dataset_with_sessions(2)).await);
        assert!(!state.install(first, dataset_with_sessions(1)).await);

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.generation, second);
        assert_eq!(snapshot.dataset.sessions.len(), 2);
    }

    #[tokio::test]
    async fn in_order_cycles_replace_wholesale() {
        let state = state("unused.json".into());
        let first = state.begin_cycle();
        assert!(state.install(first, dataset_with_sessions(3)).await);
        let before = state.snapshot().await;

        let second = state.begin_cycle();
        assert!(state.install(second, dataset_with_sessions(1)).await);

        assert_eq!(before.dataset.sessions.len(), 3);
        assert_eq!(state.snapshot().await.dataset.sessions.len(), 1);
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_data() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let config = Config::from_lookup(|key| (key == "API_BASE_URL").then(|| base.clone()));
        let state = AppState::new(config, Preferences::default());
        let generation = state.begin_cycle();
        state.install(generation, dataset_with_sessions(4)).await;

        assert!(state.refresh().await.is_err());
        assert_eq!(state.snapshot().await.dataset.sessions.len(), 4);
    }

    #[tokio::test]
    async fn theme_toggle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let state = state(path.clone());

        assert_eq!(state.theme().await, Theme::Dark);
        assert_eq!(state.toggle_theme().await.unwrap(), Theme::Light);

        let reloaded = crate::storage::load_preferences(&path).await;
        assert_eq!(reloaded.theme(), Theme::Light);
    }

    #[tokio::test]
    async fn failed_theme_write_keeps_current_theme() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let state = state(blocker.join("preferences.json"));

        assert!(state.toggle_theme().await.is_err());
        assert_eq!(state.theme().await, Theme::Dark);
    }
}
