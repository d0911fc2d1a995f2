//! Common test utilities for in-process API testing.
//!
//! The fixture wires the real router to the fixture reference set, an
//! in-memory catalog backed by sqlite in a temp dir, and optionally a
//! scanner over a temp ROM folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use romcheck_core::{
    load_config_from_str, ArchiveScanner, CatalogPersistence, CatalogStore, ReferenceIndex,
    SqliteCatalogPersistence,
};

/// Re-export fixtures for test convenience
pub use romcheck_core::testing::fixtures;

/// Test fixture for in-process API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_sets() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.post("/api/v1/sets", json!([fixtures::sha1('1')])).await;
///     assert_eq!(response.status, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared catalog, for seeding and inspecting state directly
    pub catalog: Arc<CatalogStore>,
    /// Persistence behind the catalog
    pub persistence: Arc<dyn CatalogPersistence>,
    /// Temporary directory for the catalog database and ROM folder
    pub temp_dir: TempDir,
    /// ROM folder watched by the scanner (if enabled)
    pub rom_dir: Option<PathBuf>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture without a scanner.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        Self::build(test_config, fixtures::reference_index()).await
    }

    /// Create a test fixture over a hand-built reference index.
    pub async fn with_reference(reference: ReferenceIndex) -> Self {
        Self::build(TestConfig::default(), reference).await
    }

    async fn build(test_config: TestConfig, reference: ReferenceIndex) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("catalog.db");

        let config = load_config_from_str(&format!(
            r#"
[reference]
path = "roms.txt"
version = "fixture-1"

[catalog]
database = "{}"
"#,
            db_path.display()
        ))
        .expect("Failed to build test config");

        let persistence: Arc<dyn CatalogPersistence> = Arc::new(
            SqliteCatalogPersistence::new(&db_path).expect("Failed to create catalog database"),
        );
        let catalog = Arc::new(CatalogStore::new());

        let mut state = romcheck_server::state::AppState::new(
            config,
            Arc::new(reference),
            Arc::clone(&catalog),
            Arc::clone(&persistence),
        );

        let rom_dir = if test_config.enable_scanner {
            let rom_dir = temp_dir.path().join("roms");
            std::fs::create_dir_all(&rom_dir).expect("Failed to create ROM dir");
            let scanner = ArchiveScanner::new(
                &rom_dir,
                vec!["7z".to_string(), "zip".to_string()],
                Duration::ZERO,
            );
            state = state.with_scanner(Arc::new(scanner));
            Some(rom_dir)
        } else {
            None
        };

        let router = romcheck_server::api::create_router(Arc::new(state));

        Self {
            router,
            catalog,
            persistence,
            temp_dir,
            rom_dir,
        }
    }

    /// Drop an (empty) archive file into the ROM folder.
    pub fn add_rom_file(&self, relative: &str) -> PathBuf {
        let root: &Path = self.rom_dir.as_deref().expect("Scanner not enabled");
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create ROM subdir");
        }
        std::fs::write(&path, b"archive").expect("Failed to write ROM file");
        path
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    /// Fetch a non-JSON endpoint, returning status and text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Attach a scanner over a temp ROM folder
    pub enable_scanner: bool,
}

impl TestConfig {
    /// Create config with the scanner enabled.
    pub fn with_scanner() -> Self {
        Self {
            enable_scanner: true,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
