//! Lifecycle helper for the embedded PostgreSQL cluster used by the tests.
//!
//! PostgreSQL refuses to run as root, so when the test suite runs with root
//! privileges `pg-embed-setup-unpriv` re-executes each lifecycle step through
//! this binary as an unprivileged user:
//!
//! ```text
//! pg-worker <setup|start|stop> <payload.json>
//! ```
//!
//! The payload is a serialised `WorkerPayload` carrying the PostgreSQL
//! settings and the environment the step must see.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use color_eyre::eyre::{Context, Report, Result, bail, eyre};
use pg_embedded_setup_unpriv::worker::WorkerPayload;
use postgresql_embedded::PostgreSQL;
use tokio::runtime::Builder;

const USAGE: &str = "usage: pg-worker <setup|start|stop> <payload.json>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Setup,
    Start,
    Stop,
}

impl FromStr for Step {
    type Err = Report;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "setup" => Ok(Self::Setup),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(eyre!("unknown step '{other}'; {USAGE}")),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let (step, payload_path) = parse_args(env::args_os().skip(1))?;
    run(step, &payload_path)
}

fn parse_args(args: impl IntoIterator<Item = OsString>) -> Result<(Step, PathBuf)> {
    let mut args = args.into_iter();
    let (Some(step), Some(path), None) = (args.next(), args.next(), args.next()) else {
        bail!(USAGE);
    };
    Ok((step.to_string_lossy().parse()?, PathBuf::from(path)))
}

fn run(step: Step, payload_path: &Path) -> Result<()> {
    let raw = fs::read(payload_path)
        .wrap_err_with(|| format!("failed to read payload {}", payload_path.display()))?;
    let payload: WorkerPayload =
        serde_json::from_slice(&raw).wrap_err("failed to parse worker payload")?;
    let settings = payload
        .settings
        .into_settings()
        .map_err(|err| eyre!("failed to rebuild postgres settings: {err}"))?;

    for (key, value) in payload.environment {
        // SAFETY: still single-threaded; the runtime is built below.
        match value {
            Some(value) => unsafe { env::set_var(&key, value.expose()) },
            None => unsafe { env::remove_var(&key) },
        }
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build worker runtime")?;
    let mut postgres = PostgreSQL::new(settings);
    runtime
        .block_on(async {
            match step {
                Step::Setup => postgres.setup().await,
                Step::Start => postgres.start().await,
                Step::Stop => postgres.stop().await,
            }
        })
        .map_err(|err| eyre!("postgres {step:?} failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("setup", Step::Setup)]
    #[case("start", Step::Start)]
    #[case("stop", Step::Stop)]
    fn known_steps_parse(#[case] raw: &str, #[case] expected: Step) {
        let (step, path) = parse_args(args(&[raw, "/tmp/payload.json"])).expect("valid args");
        assert_eq!(step, expected);
        assert_eq!(path, PathBuf::from("/tmp/payload.json"));
    }

    #[rstest]
    #[case::missing_payload(&["setup"])]
    #[case::extra_argument(&["setup", "/tmp/payload.json", "surplus"])]
    #[case::unknown_step(&["restart", "/tmp/payload.json"])]
    fn malformed_invocations_are_rejected(#[case] raw: &[&str]) {
        let err = parse_args(args(raw)).expect_err("malformed invocation");
        assert!(err.to_string().contains("usage: pg-worker"));
    }

    #[rstest]
    fn unreadable_payload_is_reported() {
        let err = run(Step::Setup, Path::new("/nonexistent/payload.json"))
            .expect_err("missing payload file");
        assert!(err.to_string().contains("failed to read payload"));
    }
}
