use super::memory::MemoryStore;
use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    fs,
    future::Future,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use storefront::{
    config::AppConfig,
    server::{Server, API_KEY_HEADER, USER_ID_HEADER},
    state::AppState,
    telemetry::init_tracing,
};
use tokio::time::{sleep, Duration};
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tower::ServiceExt;

pub const API_KEY: &str = "test-api-key";
const DB_CONNECT_RETRIES: usize = 40;
const DB_CONNECT_DELAY_MS: u64 = 250;

/// Router wired to an in-memory store, with the API key gate enabled.
pub fn memory_harness(store: MemoryStore) -> StorefrontHarness {
    init_tracing();
    let config = Arc::new(test_config("postgres://unused/storefront".to_string()));
    let shared = Arc::new(store);
    let state = AppState::new(config, shared.clone(), shared);
    StorefrontHarness {
        router: Server::from_state(state).router(),
    }
}

/// Runs a test closure against a router backed by the Postgres fixture. Skips when
/// `STOREFRONT_TEST_DATABASE_URL` is not set.
pub async fn with_postgres_harness<F, Fut>(test: F)
where
    F: FnOnce(StorefrontHarness) -> Fut,
    Fut: Future<Output = ()>,
{
    init_tracing();

    let database_url = match read_env_value("STOREFRONT_TEST_DATABASE_URL")
        .expect("failed to read STOREFRONT_TEST_DATABASE_URL")
    {
        Some(url) => url,
        None => {
            eprintln!(
                "[storefront-test] skipping Postgres tests: STOREFRONT_TEST_DATABASE_URL unset"
            );
            return;
        }
    };

    seed_fixture_database(&database_url)
        .await
        .expect("failed to seed fixture database");

    let server = Server::new(test_config(database_url))
        .await
        .expect("failed to boot storefront against fixture database");

    test(StorefrontHarness {
        router: server.router(),
    })
    .await;
}

fn test_config(database_url: String) -> AppConfig {
    AppConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url,
        max_pool_size: 5,
        pg_ssl_root_cert: None,
        pg_ssl_cert: None,
        pg_ssl_key: None,
        api_key: Some(API_KEY.to_string()),
    }
}

#[derive(Clone)]
pub struct StorefrontHarness {
    router: Router,
}

impl StorefrontHarness {
    pub async fn get(&self, path: &str) -> http::Response<Body> {
        self.send("GET", path, None::<&()>, None, true).await
    }

    pub async fn get_as(&self, path: &str, user_id: i64) -> http::Response<Body> {
        self.send("GET", path, None::<&()>, Some(user_id), true).await
    }

    pub async fn get_without_api_key(&self, path: &str) -> http::Response<Body> {
        self.send("GET", path, None::<&()>, None, false).await
    }

    pub async fn send_json<T>(
        &self,
        method: &str,
        path: &str,
        payload: &T,
        user_id: Option<i64>,
    ) -> http::Response<Body>
    where
        T: Serialize,
    {
        self.send(method, path, Some(payload), user_id, true).await
    }

    pub async fn delete_as(&self, path: &str, user_id: i64) -> http::Response<Body> {
        self.send("DELETE", path, None::<&()>, Some(user_id), true)
            .await
    }

    async fn send<T>(
        &self,
        method: &str,
        path: &str,
        payload: Option<&T>,
        user_id: Option<i64>,
        include_api_key: bool,
    ) -> http::Response<Body>
    where
        T: Serialize,
    {
        let mut builder = Request::builder().method(method).uri(path);

        if include_api_key {
            builder = builder.header(API_KEY_HEADER, API_KEY);
        }
        if let Some(user_id) = user_id {
            builder = builder.header(USER_ID_HEADER, user_id.to_string());
        }

        let body = match payload {
            Some(payload) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(payload).expect("request payload should serialize"))
            }
            None => Body::empty(),
        };

        let request = builder
            .body(body)
            .expect("failed to build harness request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should deserialize");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}

async fn seed_fixture_database(database_url: &str) -> anyhow::Result<()> {
    let config: PgConfig = database_url.parse()?;
    let mut attempts = 0usize;
    let client = loop {
        match connect(&config).await {
            Ok(client) => break client,
            Err(err) => {
                if attempts >= DB_CONNECT_RETRIES {
                    return Err(err);
                }
                attempts += 1;
                sleep(Duration::from_millis(DB_CONNECT_DELAY_MS)).await;
            }
        }
    };

    client.batch_execute(&load_fixture("schema.sql")?).await?;
    client.batch_execute(&load_fixture("seed.sql")?).await?;
    Ok(())
}

async fn connect(config: &PgConfig) -> anyhow::Result<Client> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            eprintln!("[storefront-test] fixture connection closed with error: {err}");
        }
    });
    Ok(client)
}

fn read_env_value(key: &str) -> anyhow::Result<Option<String>> {
    if let Ok(value) = std::env::var(key) {
        if value.trim().is_empty() {
            anyhow::bail!("{key} is set but empty");
        }
        return Ok(Some(value));
    }
    let file_key = format!("{key}_FILE");
    if let Ok(path) = std::env::var(&file_key) {
        let value = fs::read_to_string(&path)
            .map_err(|err| anyhow::anyhow!("failed to read {file_key} ({path}): {err}"))?
            .trim()
            .to_string();
        if value.is_empty() {
            anyhow::bail!("{file_key} pointed at an empty file");
        }
        return Ok(Some(value));
    }
    Ok(None)
}

fn load_fixture(name: &str) -> anyhow::Result<String> {
    let path = fixture_root().join(name);
    fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("failed to read fixture {name} from {:?}: {err}", path))
}

fn fixture_root() -> PathBuf {
    if let Ok(root) = std::env::var("STOREFRONT_FIXTURE_ROOT") {
        let candidate = PathBuf::from(root);
        if candidate.exists() {
            return candidate;
        }
    }

    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}
