use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct ProgressRow {
    id: String,
    name: String,
    target: f64,
    total: f64,
    percent: f64,
    remaining: f64,
}

#[derive(Debug, Deserialize)]
struct TierRow {
    target: f64,
    achieved: f64,
    percent: f64,
    remaining: f64,
}

#[derive(Debug, Deserialize)]
struct TierBlock {
    activity: TierRow,
    sales_tier2: TierRow,
    sales_tier3: TierRow,
}

#[derive(Debug, Deserialize)]
struct ActivityRow {
    id: String,
    incentive_id: String,
    incentive_name: String,
    amount: f64,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DashboardBody {
    incentives: Vec<ProgressRow>,
    tiers: TierBlock,
    recent_activity: Vec<ActivityRow>,
}

#[derive(Debug, Deserialize)]
struct IncentiveRow {
    id: String,
    name: String,
    target: f64,
}

#[derive(Debug, Deserialize)]
struct ContributionRow {
    id: String,
    incentive_id: String,
    amount: f64,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    contribution: ContributionRow,
    total: f64,
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
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

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
    path.push(format!(
        "incentive_board_http_{}_{}.json",
        std::process::id(),
        nanos
    ));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/dashboard")).send().await {
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
    let child = Command::new(env!("CARGO_BIN_EXE_incentive_board"))
        .env("PORT", port.to_string())
        .env("INCENTIVE_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .env_remove("INCENTIVE_SERVICE_URL")
        .env_remove("INCENTIVE_SERVICE_KEY")
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

async fn get_dashboard(client: &Client, base_url: &str) -> DashboardBody {
    client
        .get(format!("{base_url}/api/dashboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn incentive_id(client: &Client, base_url: &str, name: &str) -> String {
    let incentives: Vec<IncentiveRow> = client
        .get(format!("{base_url}/api/incentives"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    incentives
        .into_iter()
        .find(|incentive| incentive.name == name)
        .unwrap_or_else(|| panic!("no incentive named {name}"))
        .id
}

fn row<'a>(dashboard: &'a DashboardBody, name: &str) -> &'a ProgressRow {
    dashboard
        .incentives
        .iter()
        .find(|row| row.name == name)
        .unwrap_or_else(|| panic!("no dashboard row named {name}"))
}

#[tokio::test]
async fn http_dashboard_lists_seeded_incentives() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let dashboard = get_dashboard(&client, &server.base_url).await;

    assert_eq!(row(&dashboard, "New Jobs").target, 40.0);
    assert_eq!(row(&dashboard, "Reviews").target, 60.0);
    assert_eq!(row(&dashboard, "Referrals").target, 25.0);
    assert_eq!(row(&dashboard, "Sales Incentive - Tier 2").target, 100_000.0);

    for row in &dashboard.incentives {
        assert!(!row.id.is_empty());
        assert!((0.0..=1.0).contains(&row.percent), "percent out of range for {}", row.name);
        assert_eq!(row.remaining, (row.target - row.total).max(0.0));
    }

    // Tier targets come from the seeded incentives, not from totals.
    assert_eq!(dashboard.tiers.activity.target, 125.0);
    assert_eq!(dashboard.tiers.sales_tier2.target, 100_000.0);
    assert_eq!(dashboard.tiers.sales_tier3.target, 250_000.0);
    assert_eq!(
        dashboard.tiers.sales_tier3.achieved,
        dashboard.tiers.sales_tier2.achieved
    );
    for tier in [
        &dashboard.tiers.activity,
        &dashboard.tiers.sales_tier2,
        &dashboard.tiers.sales_tier3,
    ] {
        assert!((0.0..=1.0).contains(&tier.percent));
        assert_eq!(tier.remaining, (tier.target - tier.achieved).max(0.0));
    }

    assert!(!dashboard.recent_activity.is_empty());
}

#[tokio::test]
async fn http_contribution_updates_total_without_double_count() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let reviews = incentive_id(&client, &server.base_url, "Reviews").await;
    let before = row(&get_dashboard(&client, &server.base_url).await, "Reviews").total;

    let response = client
        .post(format!("{}/api/contributions", server.base_url))
        .json(&serde_json::json!({
            "incentive_id": reviews,
            "amount": "7",
            "note": "  window add-on  ",
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let submitted: SubmitBody = response.json().await.unwrap();
    assert_eq!(submitted.contribution.amount, 7.0);
    assert_eq!(submitted.contribution.incentive_id, reviews);
    assert_eq!(submitted.contribution.note.as_deref(), Some("window add-on"));
    assert!(!submitted.contribution.id.starts_with("local-"));
    assert_eq!(submitted.total, before + 7.0);

    // Let the feed echo the insert back; the total must not move again.
    sleep(Duration::from_millis(250)).await;
    let after = row(&get_dashboard(&client, &server.base_url).await, "Reviews").total;
    assert_eq!(after, before + 7.0);
}

#[tokio::test]
async fn http_deduction_decreases_total() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let jobs = incentive_id(&client, &server.base_url, "New Jobs").await;
    let before = row(&get_dashboard(&client, &server.base_url).await, "New Jobs").total;

    let submitted: SubmitBody = client
        .post(format!("{}/api/contributions", server.base_url))
        .json(&serde_json::json!({
            "incentive_id": jobs,
            "amount": 2,
            "deduction": true,
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submitted.contribution.amount, -2.0);
    assert_eq!(submitted.total, before - 2.0);

    let dashboard = get_dashboard(&client, &server.base_url).await;
    assert_eq!(row(&dashboard, "New Jobs").total, before - 2.0);

    let newest = &dashboard.recent_activity[0];
    assert_eq!(newest.id, submitted.contribution.id);
    assert_eq!(newest.incentive_id, jobs);
    assert_eq!(newest.amount, -2.0);
}

#[tokio::test]
async fn http_rejects_zero_amount() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let reviews = incentive_id(&client, &server.base_url, "Reviews").await;
    let before = row(&get_dashboard(&client, &server.base_url).await, "Reviews").total;

    let response = client
        .post(format!("{}/api/contributions", server.base_url))
        .json(&serde_json::json!({
            "incentive_id": reviews,
            "amount": "0",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let message = response.text().await.unwrap();
    assert!(message.contains("amount"), "unexpected message: {message}");

    let after = row(&get_dashboard(&client, &server.base_url).await, "Reviews").total;
    assert_eq!(after, before);
}

#[tokio::test]
async fn http_created_incentive_shows_up_on_the_dashboard() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let created: IncentiveRow = client
        .post(format!("{}/api/incentives", server.base_url))
        .json(&serde_json::json!({ "name": "Gutter Cleans", "target": 30.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.name, "Gutter Cleans");
    assert_eq!(created.target, 30.0);

    assert_eq!(
        incentive_id(&client, &server.base_url, "Gutter Cleans").await,
        created.id
    );

    let dashboard = get_dashboard(&client, &server.base_url).await;
    let fresh = row(&dashboard, "Gutter Cleans");
    assert_eq!(fresh.total, 0.0);
    assert_eq!(fresh.percent, 0.0);
    assert_eq!(fresh.remaining, 30.0);
}

#[tokio::test]
async fn http_activity_limit_is_applied() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let activity: Vec<ActivityRow> = client
        .get(format!("{}/api/activity?limit=2", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(activity.len(), 2);
    assert!(activity[0].created_at >= activity[1].created_at);
    for entry in &activity {
        assert!(!entry.id.is_empty());
        assert!(!entry.incentive_name.is_empty());
    }

    // The seeds all carry notes, so at least one must survive the joins.
    let full: Vec<ActivityRow> = client
        .get(format!("{}/api/activity", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(full.iter().any(|entry| entry.note.is_some()));
}
