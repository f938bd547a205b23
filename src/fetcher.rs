use crate::config::Endpoints;
use crate::errors::FetchError;
use crate::models::{AttendanceRecord, Dataset, Session, User};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

/// Fetches all three collections concurrently. The first failure aborts the
/// cycle and nothing partial is returned.
#[instrument(name = "fetch_all", skip_all)]
pub async fn fetch_all(client: &Client, endpoints: &Endpoints) -> Result<Dataset, FetchError> {
    let (users, sessions, attendance) = tokio::try_join!(
        fetch_json::<Vec<User>>(client, "users", &endpoints.users),
        fetch_json::<Vec<Session>>(client, "sessions", &endpoints.sessions),
        fetch_json::<Vec<AttendanceRecord>>(client, "attendance", &endpoints.attendance),
    )?;

    Ok(Dataset {
        users,
        sessions,
        attendance,
    })
}

async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    endpoint: &'static str,
    url: &str,
) -> Result<T, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request { endpoint, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { endpoint, status });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Request { endpoint, source })?;
    serde_json::from_slice(&body).map_err(|source| FetchError::Decode { endpoint, source })
}
