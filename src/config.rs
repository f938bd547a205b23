use std::{env, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/preferences.json";
const DEFAULT_API_BASE: &str = "http://127.0.0.1:5678/webhook";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub users: String,
    pub sessions: String,
    pub attendance: String,
}

impl Endpoints {
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            users: format!("{base}/user"),
            sessions: format!("{base}/Sessions"),
            attendance: format!("{base}/Attendance"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub endpoints: Endpoints,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let data_path = lookup("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let base = lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let defaults = Endpoints::from_base(&base);
        let endpoints = Endpoints {
            users: lookup("USERS_URL").unwrap_or(defaults.users),
            sessions: lookup("SESSIONS_URL").unwrap_or(defaults.sessions),
            attendance: lookup("ATTENDANCE_URL").unwrap_or(defaults.attendance),
        };

        Self {
            port,
            data_path,
            endpoints,
        }
    }
}
