use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use reqwest::header::HeaderMap;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use grenades_api::cache::ResponseCache;
use grenades_api::config::{
    AppConfig, CacheConfig, CorsConfig, DatabaseConfig, LimiterConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
use grenades_api::database::sync_schema;
use grenades_api::middleware::rate_limit::RateLimiter;
use grenades_api::state::{AppState, build_image_store};

pub mod routes {
    pub const HEALTHCHECK: &str = "/v1/healthcheck";
    pub const GRENADES: &str = "/v1/grenades";
    pub const IMAGES: &str = "/v1/images";

    pub fn grenade(id: i64) -> String {
        format!("/v1/grenades/{id}")
    }

    pub fn grenade_images(id: i64) -> String {
        format!("/v1/grenades/{id}/images")
    }

    pub fn image(id: i64) -> String {
        format!("/v1/images/{id}")
    }
}

/// Knobs for a single test server. The response cache is off unless requested.
#[derive(Default)]
pub struct TestOptions {
    pub cache: bool,
    /// `(rps, burst)` for the per-IP limiter.
    pub limiter: Option<(f64, u32)>,
}

/// A running test server backed by a temp-dir SQLite database and image store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub images_dir: PathBuf,
    shutdown: CancellationToken,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let images_dir = dir.path().join("images");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let mut opts = ConnectOptions::new(&db_url);
        opts.max_connections(5).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to connect to test database");
        sync_schema(&db).await.expect("Failed to sync schema");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        let (rps, burst) = options.limiter.unwrap_or((10.0, 4));
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: addr.port(),
                environment: "testing".to_string(),
                cors: CorsConfig {
                    trusted_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url,
                max_connections: 5,
                min_connections: 1,
                idle_timeout_secs: 900,
            },
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                images_dir: images_dir.clone(),
                images_url_prefix: "/v1/image".to_string(),
                public_base_url: format!("http://{addr}/v1/image/"),
                s3: None,
            },
            limiter: LimiterConfig {
                enabled: options.limiter.is_some(),
                rps,
                burst,
            },
            cache: CacheConfig {
                enabled: options.cache,
                expiration_secs: 600,
                cleanup_secs: 1200,
                max_entries: 1000,
            },
        };

        let image_store = build_image_store(&config.storage)
            .await
            .expect("Failed to create image store");
        let cache = Arc::new(ResponseCache::from_config(&config.cache));
        let limiter = config
            .limiter
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.limiter)));

        let state = AppState {
            db: db.clone(),
            image_store,
            cache,
            config,
        };
        let app = grenades_api::build_router(state, limiter);

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            grenades_api::server::serve(listener, app, token)
                .await
                .unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            images_dir,
            shutdown,
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        self.post_raw(path, body.to_string()).await
    }

    /// POST an arbitrary body labelled as JSON.
    pub async fn post_raw(&self, path: &str, body: impl Into<reqwest::Body>) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_json(
        &self,
        path: &str,
        body: &Value,
        expected_version: Option<&str>,
    ) -> TestResponse {
        let mut req = self.client.patch(self.url(path)).json(body);
        if let Some(version) = expected_version {
            req = req.header("X-Expected-Version", version);
        }
        let res = req.send().await.expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload(&self, path: &str, file_name: &str, bytes: Vec<u8>) -> TestResponse {
        self.upload_field(path, "grenadeImage", file_name, bytes).await
    }

    pub async fn upload_field(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let res = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Fetch an absolute URL and return status plus raw bytes.
    pub async fn fetch_bytes(&self, url: &str) -> (u16, Vec<u8>) {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .expect("Failed to fetch URL");
        let status = res.status().as_u16();
        let bytes = res.bytes().await.unwrap_or_default().to_vec();
        (status, bytes)
    }

    /// Create a grenade via the API and return its `id`.
    pub async fn create_grenade(&self, map: &str, grenade_type: &str, side: &str) -> i64 {
        let res = self
            .post_json(
                routes::GRENADES,
                &serde_json::json!({
                    "map": map,
                    "title": format!("{grenade_type} from {side} on {map}"),
                    "description": "Line up with the lamp post, jump throw.",
                    "type": grenade_type,
                    "side": side,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "create_grenade failed: {}", res.text);
        res.body["grenade"]["id"]
            .as_i64()
            .expect("response should contain grenade.id")
    }

    /// Upload an image to a grenade via the API and return the `image` object.
    pub async fn upload_image(&self, grenade_id: i64, file_name: &str, bytes: &[u8]) -> Value {
        let res = self
            .upload(&routes::grenade_images(grenade_id), file_name, bytes.to_vec())
            .await;
        assert_eq!(res.status, 200, "upload failed: {}", res.text);
        res.body["image"].clone()
    }

    /// Names of stored image objects, excluding in-progress temp files.
    pub fn stored_objects(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.images_dir)
            .expect("images dir should exist")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
