use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct ThemeResponse {
    theme: String,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    /// Remembers the latest child so it is killed if the test binary exits early.
    pub fn register(pid: u32) {
        PID.store(pid as i32, Ordering::SeqCst);
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

/// Stand-in for the three upstream endpoints. `failing` turns the sessions
/// endpoint into a 500.
#[derive(Clone, Default)]
struct Upstream {
    failing: Arc<AtomicBool>,
}

async fn users() -> Json<Value> {
    Json(json!([
        {
            "name": "Ahmed Ali",
            "role": "student",
            "whatsapp": "01000000000",
            "uid_rfid": "S-1",
            "Network theory": r#"{"rate":80,"present":8,"absent":2,"total_sessions":10,"sessions":[]}"#
        },
        { "name": "Sara Omar", "role": "student", "uid_rfid": "S-2" },
        { "name": "Dr. Hany", "role": "teacher", "uid_rfid": "T-1" }
    ]))
}

async fn sessions(State(upstream): State<Upstream>) -> impl IntoResponse {
    if upstream.failing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream down").into_response();
    }
    Json(json!([
        {
            "session_id": "NT-1",
            "teacher_uid": "T-1",
            "teacher_name": "Dr. Hany",
            "status": "Closed",
            "start_time": "2024-01-01T10:00:00",
            "end_time": "2024-01-01T11:30:00"
        },
        {
            "session_id": "NT-2",
            "teacher_uid": "T-1",
            "teacher_name": "Dr. Hany",
            "status": "Open",
            "start_time": "2024-01-08T10:00:00",
            "end_time": "2024-01-08T11:00:00"
        }
    ]))
    .into_response()
}

async fn attendance() -> Json<Value> {
    Json(json!([
        { "session_id": "NT-1", "student_name": "Ahmed Ali", "teacher_name": "Dr. Hany",
          "scan_time": "2024-01-01T10:05:00", "status": "Present" },
        { "session_id": "NT-1", "student_name": "Sara Omar", "teacher_name": "Dr. Hany",
          "scan_time": "2024-01-01T10:20:00", "status": "Late" }
    ]))
}

async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/webhook/user", get(users))
        .route("/webhook/Sessions", get(sessions))
        .route("/webhook/Attendance", get(attendance))
        .with_state(upstream);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/webhook")
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/theme")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(api_base: &str, data_path: &Path) -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_attendance_dashboard"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("API_BASE_URL", api_base)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

fn preferences_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("preferences.json")
}

async fn page(client: &Client, server: &TestServer, path: &str) -> (StatusCode, String) {
    let resp = client
        .get(format!("{}{path}", server.base_url))
        .send()
        .await
        .unwrap();
    (resp.status(), resp.text().await.unwrap())
}

#[tokio::test]
async fn http_page_load_renders_fetched_data() {
    let _guard = TEST_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let api = spawn_upstream(Upstream::default()).await;
    let server = spawn_server(&api, &preferences_path(&dir)).await;
    let client = Client::new();

    let (status, html) = page(&client, &server, "/").await;
    assert!(status.is_success());
    assert!(html.contains(r#"data-theme="dark""#));
    assert!(html.contains("Ahmed Ali"));
    assert!(html.contains("⏱️ 90 دقيقة"));
    assert!(html.contains("🌟 ممتاز"));
    assert!(!html.contains(r#"role="alert""#));

    let newest = html.find("📝 NT-2").expect("missing NT-2 card");
    let oldest = html.find("📝 NT-1").expect("missing NT-1 card");
    assert!(newest < oldest);
}

#[tokio::test]
async fn http_dashboard_reports_aggregates() {
    let _guard = TEST_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let api = spawn_upstream(Upstream::default()).await;
    let server = spawn_server(&api, &preferences_path(&dir)).await;
    let client = Client::new();

    let dashboard: Value = client
        .post(format!("{}/api/refresh", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(dashboard["overview"]["present"], 8);
    assert_eq!(dashboard["overview"]["absent"], 2);
    assert_eq!(dashboard["overview"]["total"], 10);
    assert_eq!(dashboard["overview"]["present_percentage"], "80.0");
    assert_eq!(dashboard["students"][0]["tier"], "excellent");
    assert_eq!(dashboard["students"][1]["summary"], "absent");
    assert_eq!(dashboard["teachers"][0]["session_count"], 2);
    assert_eq!(dashboard["sessions"][1]["attendance_count"], 2);
    assert_eq!(dashboard["attendance"][1]["presence"], "absent");

    let targets: Vec<i64> = dashboard["counters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["target"].as_i64().unwrap())
        .collect();
    assert_eq!(targets, [2, 1, 2, 2]);
}

#[tokio::test]
async fn http_filter_marks_rows_hidden() {
    let _guard = TEST_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let api = spawn_upstream(Upstream::default()).await;
    let server = spawn_server(&api, &preferences_path(&dir)).await;
    let client = Client::new();

    client
        .post(format!("{}/api/refresh", server.base_url))
        .send()
        .await
        .unwrap();

    let students: Value = client
        .get(format!("{}/api/students?q=AHMED", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let visible: Vec<bool> = students["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["visible"].as_bool().unwrap())
        .collect();
    assert_eq!(visible, [true, false]);

    let (_, html) = page(&client, &server, "/?tab=attendance&q=zzz").await;
    assert_eq!(html.matches(r#"<tr class="filterable" hidden>"#).count(), 2);
}

#[tokio::test]
async fn http_theme_toggle_survives_restart() {
    let _guard = TEST_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let api = spawn_upstream(Upstream::default()).await;
    let client = Client::new();

    {
        let server = spawn_server(&api, &preferences_path(&dir)).await;
        let toggled: ThemeResponse = client
            .post(format!("{}/api/theme/toggle", server.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(toggled.theme, "light");
    }

    let server = spawn_server(&api, &preferences_path(&dir)).await;
    let (_, html) = page(&client, &server, "/").await;
    assert!(html.contains(r#"data-theme="light""#));
    assert!(html.contains("الوضع الفاتح"));
}

#[tokio::test]
async fn http_failed_fetch_keeps_previous_views() {
    let _guard = TEST_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let upstream = Upstream::default();
    let api = spawn_upstream(upstream.clone()).await;
    let server = spawn_server(&api, &preferences_path(&dir)).await;
    let client = Client::new();

    let (_, first) = page(&client, &server, "/").await;
    assert!(first.contains("Ahmed Ali"));

    upstream.failing.store(true, Ordering::SeqCst);

    let (status, html) = page(&client, &server, "/").await;
    assert!(status.is_success());
    assert_eq!(html.matches(r#"role="alert""#).count(), 1);
    assert!(html.contains("Ahmed Ali"));
    assert!(html.contains("📝 NT-1"));

    let refresh = client
        .post(format!("{}/api/refresh", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(refresh.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn http_unknown_view_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let api = spawn_upstream(Upstream::default()).await;
    let server = spawn_server(&api, &preferences_path(&dir)).await;
    let client = Client::new();

    let (status, _) = page(&client, &server, "/?tab=reports").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_counter_stream_ends_on_targets() {
    let _guard = TEST_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let api = spawn_upstream(Upstream::default()).await;
    let server = spawn_server(&api, &preferences_path(&dir)).await;
    let client = Client::new();

    client
        .post(format!("{}/api/refresh", server.base_url))
        .send()
        .await
        .unwrap();

    let body = client
        .get(format!("{}/api/counters/stream", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("event: counter"));
    assert!(body.trim_end().ends_with("data: end"));
    assert!(body.contains(r#"{"counter":"totalStudents","value":2,"last":true}"#));
    assert!(body.contains(r#"{"counter":"totalTeachers","value":1,"last":true}"#));
}
