use crate::animation::{CountUpTask, Frame};
use crate::errors::AppError;
use crate::interaction::{Filtered, Searchable, Tab, Theme, ViewSwitcher, filter_items};
use crate::models::{FilterQuery, PageQuery, ThemeResponse};
use crate::state::AppState;
use crate::ui::{Page, render_page};
use crate::views::{Dashboard, build_dashboard};
use axum::{
    Json,
    extract::{Query, State},
    response::{
        Html, Redirect,
        sse::{Event, Sse},
    },
};
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

const FETCH_FAILED: &str = "حدث خطأ في تحميل البيانات. يرجى المحاولة مرة أخرى.";

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let mut views = ViewSwitcher::default();
    if let Some(name) = query.tab.as_deref() {
        views
            .switch_to(name)
            .map_err(|err| AppError::bad_request(err.to_string()))?;
    }

    let notice = state.refresh().await.err().map(|_| FETCH_FAILED);
    let snapshot = state.snapshot().await;
    let dashboard = build_dashboard(&snapshot.dataset);

    Ok(Html(render_page(&Page {
        dashboard: &dashboard,
        theme: state.theme().await,
        views,
        query: query.q.as_deref().unwrap_or_default(),
        notice,
    })))
}

pub async fn toggle_theme_form(State(state): State<AppState>) -> Result<Redirect, AppError> {
    state.toggle_theme().await?;
    Ok(Redirect::to("/"))
}

pub async fn get_theme(State(state): State<AppState>) -> Json<ThemeResponse> {
    Json(theme_response(state.theme().await))
}

pub async fn toggle_theme(State(state): State<AppState>) -> Result<Json<ThemeResponse>, AppError> {
    let theme = state.toggle_theme().await?;
    Ok(Json(theme_response(theme)))
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<Dashboard>, AppError> {
    let snapshot = state.refresh().await?;
    Ok(Json(build_dashboard(&snapshot.dataset)))
}

pub async fn get_dashboard(State(state): State<AppState>) -> Json<Dashboard> {
    let snapshot = state.snapshot().await;
    Json(build_dashboard(&snapshot.dataset))
}

pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let dashboard = current_dashboard(&state).await;
    filtered(Tab::Students, &dashboard.students, &query.q)
}

pub async fn list_teachers(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let dashboard = current_dashboard(&state).await;
    filtered(Tab::Teachers, &dashboard.teachers, &query.q)
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let dashboard = current_dashboard(&state).await;
    filtered(Tab::Sessions, &dashboard.sessions, &query.q)
}

pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Value>, AppError> {
    let dashboard = current_dashboard(&state).await;
    filtered(Tab::Attendance, &dashboard.attendance, &query.q)
}

/// Plays the four counter animations as server-sent events. The tasks live
/// inside the stream, so a disconnecting client cancels them.
pub async fn counters_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let dashboard = current_dashboard(&state).await;
    let (tx, rx) = mpsc::channel::<Frame>(16);
    let tasks: Vec<CountUpTask> = dashboard
        .counters
        .iter()
        .map(|counter| CountUpTask::spawn(counter.id, counter.target, tx.clone()))
        .collect();
    drop(tx);

    let frames = stream::unfold((rx, tasks), |(mut rx, tasks)| async move {
        let frame = rx.recv().await?;
        Some((Event::default().event("counter").json_data(&frame), (rx, tasks)))
    });
    let done = stream::once(async { Ok(Event::default().event("done").data("end")) });

    Sse::new(frames.chain(done))
}

async fn current_dashboard(state: &AppState) -> Dashboard {
    build_dashboard(&state.snapshot().await.dataset)
}

#[derive(Serialize)]
struct FilteredView<'a, T: Serialize> {
    view: Tab,
    query: &'a str,
    items: Vec<Filtered<'a, T>>,
}

fn filtered<T: Searchable + Serialize>(
    view: Tab,
    items: &[T],
    query: &str,
) -> Result<Json<Value>, AppError> {
    let body = FilteredView {
        view,
        query,
        items: filter_items(items, query),
    };
    serde_json::to_value(body)
        .map(Json)
        .map_err(AppError::internal)
}

fn theme_response(theme: Theme) -> ThemeResponse {
    ThemeResponse {
        theme: theme.as_str().to_string(),
        icon: theme.icon().to_string(),
        label: theme.label().to_string(),
    }
}
