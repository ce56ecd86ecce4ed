use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Admin invite token injected into the spawned server so tests can
/// register admin accounts deterministically
pub const ADMIN_INVITE_TOKEN: &str = "it-admin-invite";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new("target/debug/taskhub-api");
        cmd.env("TASKHUB_API_PORT", port.to_string())
            .env("ADMIN_INVITE_TOKEN", ADMIN_INVITE_TOKEN)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL from .env
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Consider server ready on any liveness response; degraded
                // (no database) still answers
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// True when the spawned server has a working database behind it
#[allow(dead_code)]
pub async fn database_available(server: &TestServer) -> Result<bool> {
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?;
    Ok(resp.status() == StatusCode::OK)
}

/// Register a fresh account with a unique email; returns (token, user id)
#[allow(dead_code)]
pub async fn register_user(
    client: &reqwest::Client,
    base_url: &str,
    name: &str,
    admin: bool,
) -> Result<(String, String)> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let email = format!("{}-{}@example.com", name.to_lowercase(), nanos);

    let mut body = json!({
        "name": name,
        "email": email,
        "password": "password123",
    });
    if admin {
        body["adminInviteToken"] = json!(ADMIN_INVITE_TOKEN);
    }

    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&body)
        .send()
        .await?;
    anyhow::ensure!(
        resp.status() == StatusCode::CREATED,
        "registration failed with {}",
        resp.status()
    );

    let value: Value = resp.json().await?;
    let token = value["data"]["token"]
        .as_str()
        .context("token missing from registration response")?
        .to_string();
    let id = value["data"]["id"]
        .as_str()
        .context("id missing from registration response")?
        .to_string();
    Ok((token, id))
}
