//! Shared helper utilities for integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! each suite pulls this module in with `mod support;`.
//!
//! Every test gets its own [`TestDatabase`]: an embedded cluster plus one
//! freshly migrated database. When the suite runs as root, the cluster steps
//! are delegated to the `pg-worker` binary built alongside the tests.

#![allow(dead_code, reason = "each test crate uses a different subset")]

use std::path::PathBuf;
use std::sync::{Mutex, Once, PoisonError};
use std::time::Duration;

use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, NoTls};
use user_store::outbound::persistence::run_pending_migrations;
use uuid::Uuid;

/// Cluster bootstraps mutate process environment, so they run one at a time.
static START_LOCK: Mutex<()> = Mutex::new(());

const START_ATTEMPTS: u32 = 3;
const START_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Running embedded cluster owning a single migrated database.
///
/// Dropping the value stops the cluster.
pub struct TestDatabase {
    url: String,
    _cluster: TestCluster,
}

impl TestDatabase {
    /// Start a cluster, create a uniquely named database and migrate it.
    pub fn start() -> Result<Self, String> {
        let cluster = start_cluster()?;
        let url = create_migrated_database(&cluster)?;
        Ok(Self {
            url,
            _cluster: cluster,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run one SQL statement and return the number of affected rows.
    ///
    /// Goes around the repository so tests can inspect or damage the schema.
    pub fn execute(&self, sql: &str) -> Result<u64, String> {
        let mut client =
            Client::connect(&self.url, NoTls).map_err(|err| format_postgres_error(&err))?;
        client
            .execute(sql, &[])
            .map_err(|err| format_postgres_error(&err))
    }
}

/// Fixture body shared by the suites: a database, or `None` when
/// `SKIP_TEST_CLUSTER` allows skipping a failed bootstrap.
pub fn test_database() -> Option<TestDatabase> {
    match TestDatabase::start() {
        Ok(database) => Some(database),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn scratch_dir() -> PathBuf {
    std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("target"))
        .join("user-store-pg")
}

fn register_worker() {
    static REGISTERED: Once = Once::new();
    REGISTERED.call_once(|| {
        if std::env::var_os("PG_EMBEDDED_WORKER").is_none() {
            // SAFETY: called under START_LOCK before any cluster thread exists.
            unsafe { std::env::set_var("PG_EMBEDDED_WORKER", env!("CARGO_BIN_EXE_pg-worker")) };
        }
    });
}

fn start_cluster() -> Result<TestCluster, String> {
    let _serialised = START_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    register_worker();

    // Binaries are installed once per test process; each cluster gets its own
    // data directory. Explicit PG_* overrides are left alone.
    let _dirs = if std::env::var_os("PG_RUNTIME_DIR").is_none()
        || std::env::var_os("PG_DATA_DIR").is_none()
    {
        let install = scratch_dir().join(format!("install-{}", std::process::id()));
        let data = scratch_dir().join(format!("data-{}", Uuid::new_v4().simple()));
        for dir in [&install, &data] {
            std::fs::create_dir_all(dir).map_err(|err| format!("{}: {err}", dir.display()))?;
        }
        Some(env_lock::lock_env([
            ("PG_RUNTIME_DIR", Some(install.to_string_lossy().into_owned())),
            ("PG_DATA_DIR", Some(data.to_string_lossy().into_owned())),
        ]))
    } else {
        None
    };

    let mut failures = Vec::new();
    for attempt in 1..=START_ATTEMPTS {
        match TestCluster::new() {
            Ok(cluster) => return Ok(cluster),
            Err(err) => failures.push(format!("attempt {attempt}: {err:?}")),
        }
        if attempt < START_ATTEMPTS {
            std::thread::sleep(START_RETRY_DELAY);
        }
    }
    Err(failures.join("; "))
}

/// `CREATE DATABASE` cannot run inside a transaction, so this uses a plain
/// `postgres` client rather than Diesel.
fn create_migrated_database(cluster: &TestCluster) -> Result<String, String> {
    let name = format!("users_{}", Uuid::new_v4().simple());
    let admin_url = cluster.connection().database_url("postgres");
    let mut admin = Client::connect(&admin_url, NoTls).map_err(|err| format_postgres_error(&err))?;
    admin
        .batch_execute(&format!("CREATE DATABASE \"{name}\""))
        .map_err(|err| format_postgres_error(&err))?;

    let url = cluster.connection().database_url(&name);
    run_pending_migrations(&url).map_err(|err| err.to_string())?;
    Ok(url)
}

/// Render a `postgres` error with its SQLSTATE and detail.
///
/// The plain `Display` output collapses server errors to `db error`.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}

/// Returns true when `SKIP_TEST_CLUSTER` is set to "1", "true" or "yes".
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip with a marker when `SKIP_TEST_CLUSTER` is truthy; otherwise panic so
/// CI breakage is not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
