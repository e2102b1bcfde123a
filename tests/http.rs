use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode, header, redirect};
use serde_json::Value;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

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

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static USER_SEQ: AtomicU32 = AtomicU32::new(0);

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
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

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("daily_tracker_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

fn unique_username(prefix: &str) -> String {
    let seq = USER_SEQ.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}_{}_{seq}", std::process::id())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("build client")
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/login/")).send().await {
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

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_daily_tracker"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
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

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn signup(client: &Client, base_url: &str, username: &str) {
    let resp = client
        .post(format!("{base_url}/signup/"))
        .form(&[
            ("username", username),
            ("password1", "correct horse"),
            ("password2", "correct horse"),
        ])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection(), "signup failed: {}", resp.status());
    assert_eq!(location(&resp), "/");
}

async fn create_task(client: &Client, base_url: &str, title: &str, date: &str) -> reqwest::Response {
    client
        .post(format!("{base_url}/"))
        .form(&[("title", title), ("task_date", date)])
        .send()
        .await
        .unwrap()
}

async fn home(client: &Client, base_url: &str, date: &str) -> Value {
    let resp = client
        .get(format!("{base_url}/api/home?date={date}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.unwrap()
}

fn calendar_cell(home: &Value, key: &str, day: u64) -> Value {
    home[key]["weeks"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|week| week.as_array().unwrap().iter())
        .find(|cell| cell["day"].as_u64() == Some(day))
        .cloned()
        .expect("missing calendar day")
}

#[tokio::test]
async fn http_requires_login() {
    let server = shared_server().await;
    let client = client();

    let resp = client.get(format!("{}/", server.base_url)).send().await.unwrap();
    assert!(resp.status().is_redirection());
    assert!(location(&resp).starts_with("/login/?next="));

    let resp = client
        .post(format!("{}/toggle/1/", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert!(location(&resp).starts_with("/login/"));
}

#[tokio::test]
async fn http_create_and_toggle_updates_progress() {
    let server = shared_server().await;
    let client = client();
    signup(&client, &server.base_url, &unique_username("milk")).await;

    let resp = create_task(&client, &server.base_url, "Buy milk", "2024-06-03").await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/?date=2024-06-03");

    let before = home(&client, &server.base_url, "2024-06-03").await;
    assert_eq!(before["total"], 1);
    assert_eq!(before["completed"], 0);
    assert_eq!(before["progress"], 0);
    assert_eq!(before["tasks"][0]["title"], "Buy milk");
    assert_eq!(calendar_cell(&before, "calendar", 3)["status"], "partial");
    assert_eq!(calendar_cell(&before, "calendar", 5)["status"], "none");
    assert_eq!(before["next_month_name"], "July");

    let id = before["tasks"][0]["id"].as_u64().unwrap();
    let resp = client
        .post(format!("{}/toggle/{id}/", server.base_url))
        .header(header::REFERER, "/?date=2024-06-03")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/?date=2024-06-03");

    let after = home(&client, &server.base_url, "2024-06-03").await;
    assert_eq!(after["completed"], 1);
    assert_eq!(after["progress"], 100);
    assert_eq!(after["tasks"][0]["is_completed"], true);
    assert_eq!(calendar_cell(&after, "calendar", 3)["status"], "complete");

    // toggling again restores the original state
    client
        .get(format!("{}/toggle/{id}/", server.base_url))
        .send()
        .await
        .unwrap();
    let again = home(&client, &server.base_url, "2024-06-03").await;
    assert_eq!(again["completed"], 0);
}

#[tokio::test]
async fn http_week_values_count_all_tasks() {
    let server = shared_server().await;
    let client = client();
    signup(&client, &server.base_url, &unique_username("week")).await;

    create_task(&client, &server.base_url, "one", "2024-06-04").await;
    create_task(&client, &server.base_url, "two", "2024-06-04").await;
    create_task(&client, &server.base_url, "three", "2024-06-09").await;

    let resp = client
        .get(format!("{}/api/home?date=2024-06-04&week=2024-06-03", server.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["week_labels"],
        serde_json::json!(["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"])
    );
    assert_eq!(body["week_values"], serde_json::json!([0, 2, 0, 0, 0, 0, 1]));
    assert_eq!(body["prev_week"], "2024-05-27");
    assert_eq!(body["next_week"], "2024-06-10");
}

#[tokio::test]
async fn http_incomplete_forms_are_ignored() {
    let server = shared_server().await;
    let client = client();
    signup(&client, &server.base_url, &unique_username("partial")).await;

    let resp = create_task(&client, &server.base_url, "", "2024-06-03").await;
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/?date=2024-06-03");

    let resp = client
        .post(format!("{}/", server.base_url))
        .form(&[("title", "no date")])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/");

    let long = "x".repeat(101);
    create_task(&client, &server.base_url, &long, "2024-06-03").await;

    let body = home(&client, &server.base_url, "2024-06-03").await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn http_malformed_dates_fail_the_request() {
    let server = shared_server().await;
    let client = client();
    signup(&client, &server.base_url, &unique_username("baddate")).await;

    for query in ["date=2024-02-30", "week=soon", "week=%2B262142-12-26", "week=-262143-01-01"] {
        let resp = client
            .get(format!("{}/api/home?{query}", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{query}");
    }

    let resp = client
        .get(format!("{}/?date=2024-02-30", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn http_tasks_are_private() {
    let server = shared_server().await;
    let owner = client();
    let intruder = client();
    signup(&owner, &server.base_url, &unique_username("owner")).await;
    signup(&intruder, &server.base_url, &unique_username("intruder")).await;

    create_task(&owner, &server.base_url, "secret", "2024-06-03").await;
    let body = home(&owner, &server.base_url, "2024-06-03").await;
    let id = body["tasks"][0]["id"].as_u64().unwrap();

    let theirs = home(&intruder, &server.base_url, "2024-06-03").await;
    assert_eq!(theirs["total"], 0);

    for action in ["toggle", "delete"] {
        let resp = intruder
            .post(format!("{}/{action}/{id}/", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    let body = home(&owner, &server.base_url, "2024-06-03").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["completed"], 0);
}

#[tokio::test]
async fn http_delete_removes_task() {
    let server = shared_server().await;
    let client = client();
    signup(&client, &server.base_url, &unique_username("delete")).await;

    create_task(&client, &server.base_url, "temporary", "2024-06-03").await;
    let body = home(&client, &server.base_url, "2024-06-03").await;
    let id = body["tasks"][0]["id"].as_u64().unwrap();

    let resp = client
        .post(format!("{}/delete/{id}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/");

    let body = home(&client, &server.base_url, "2024-06-03").await;
    assert_eq!(body["total"], 0);

    let resp = client
        .post(format!("{}/delete/{id}/", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_logout_and_login_again() {
    let server = shared_server().await;
    let client = client();
    let username = unique_username("session");
    signup(&client, &server.base_url, &username).await;

    let resp = client.get(format!("{}/logout/", server.base_url)).send().await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/login/");

    let resp = client.get(format!("{}/", server.base_url)).send().await.unwrap();
    assert!(resp.status().is_redirection());

    let resp = client
        .post(format!("{}/login/", server.base_url))
        .form(&[
            ("username", username.as_str()),
            ("password", "wrong"),
            ("next", "/monthly/"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("correct username and password"));

    let resp = client
        .post(format!("{}/login/", server.base_url))
        .form(&[
            ("username", username.as_str()),
            ("password", "correct horse"),
            ("next", "/monthly/"),
        ])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/monthly/");

    let resp = client.get(format!("{}/monthly/", server.base_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn http_duplicate_signup_is_rejected() {
    let server = shared_server().await;
    let username = unique_username("dupe");
    signup(&client(), &server.base_url, &username).await;

    let resp = client()
        .post(format!("{}/signup/", server.base_url))
        .form(&[
            ("username", username.as_str()),
            ("password1", "pw"),
            ("password2", "pw"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("already exists"));
}

#[tokio::test]
async fn http_home_page_escapes_titles() {
    let server = shared_server().await;
    let client = client();
    signup(&client, &server.base_url, &unique_username("html")).await;

    create_task(&client, &server.base_url, "<script>alert(1)</script>", "2024-06-03").await;
    let resp = client
        .get(format!("{}/?date=2024-06-03", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = resp.text().await.unwrap();
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>alert(1)"));
    assert!(html.contains("June 2024"));
    assert!(html.contains("July 2024"));
}
