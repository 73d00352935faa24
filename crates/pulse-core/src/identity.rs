//! Build identity (commit + build timestamp).
//!
//! Resolved once during process initialization and then shared read-only.
//! Nothing downstream re-reads the environment, so the startup log line and
//! every later health/version response report the same values.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::env::EnvSource;

/// Env input carrying the commit identifier.
pub const ENV_GIT_SHA: &str = "GIT_SHA";
/// Env input carrying the build timestamp.
pub const ENV_BUILD_TIME: &str = "BUILD_TIME";
/// Commit reported when `GIT_SHA` is absent.
pub const UNKNOWN_COMMIT: &str = "unknown";

/// Which build of the service is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildIdentity {
    commit_sha: String,
    build_time: String,
}

impl BuildIdentity {
    pub fn new(commit_sha: impl Into<String>, build_time: impl Into<String>) -> Self {
        Self {
            commit_sha: commit_sha.into(),
            build_time: build_time.into(),
        }
    }

    /// Resolve from `env`, defaulting the build time to "now".
    ///
    /// Never fails. Emits one startup log entry with the resolved values.
    pub fn resolve<E: EnvSource + ?Sized>(env: &E) -> Self {
        Self::resolve_at(env, Utc::now())
    }

    /// Same as [`BuildIdentity::resolve`] with an explicit clock reading.
    pub fn resolve_at<E: EnvSource + ?Sized>(env: &E, now: DateTime<Utc>) -> Self {
        let commit_sha = env
            .non_empty(ENV_GIT_SHA)
            .unwrap_or_else(|| UNKNOWN_COMMIT.to_string());
        let build_time = env
            .non_empty(ENV_BUILD_TIME)
            .unwrap_or_else(|| iso8601(now));

        tracing::info!(git_sha = %commit_sha, build_time = %build_time, "build identity resolved");

        Self {
            commit_sha,
            build_time,
        }
    }

    pub fn commit_sha(&self) -> &str {
        &self.commit_sha
    }

    pub fn build_time(&self) -> &str {
        &self.build_time
    }
}

/// UTC timestamp as ISO-8601 with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().unwrap_or_default()
    }

    #[test]
    fn explicit_values_win() {
        let env = MapEnv::new()
            .with(ENV_GIT_SHA, "abc123")
            .with(ENV_BUILD_TIME, "2023-01-01T00:00:00Z");
        let id = BuildIdentity::resolve_at(&env, fixed_now());
        assert_eq!(id.commit_sha(), "abc123");
        assert_eq!(id.build_time(), "2023-01-01T00:00:00Z");
    }

    #[test]
    fn defaults_when_absent() {
        let id = BuildIdentity::resolve_at(&MapEnv::new(), fixed_now());
        assert_eq!(id.commit_sha(), UNKNOWN_COMMIT);
        assert_eq!(id.build_time(), "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn empty_values_fall_back() {
        let env = MapEnv::new().with(ENV_GIT_SHA, "").with(ENV_BUILD_TIME, "");
        let id = BuildIdentity::resolve_at(&env, fixed_now());
        assert_eq!(id.commit_sha(), UNKNOWN_COMMIT);
        assert_eq!(id.build_time(), "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn resolved_value_ignores_later_env_changes() {
        let mut env = MapEnv::new().with(ENV_GIT_SHA, "abc123");
        let id = BuildIdentity::resolve(&env);
        let before = id.clone();

        env.set(ENV_GIT_SHA, "def456");
        env.set(ENV_BUILD_TIME, "1999-01-01T00:00:00Z");

        assert_eq!(id, before);
        assert_eq!(id.commit_sha(), "abc123");
    }

    #[test]
    fn iso8601_uses_z_suffix_and_millis() {
        assert_eq!(iso8601(fixed_now()), "2024-05-01T12:30:00.000Z");
    }
}
