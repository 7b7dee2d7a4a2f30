//! Service configuration.
//!
//! Every flag can also be supplied through its `NILAI_*` environment variable.
//! `RUST_LOG`, when set, overrides `--log-level`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::aggregate::RowErrorPolicy;

#[derive(Debug, Clone, Parser)]
#[command(name = "nilaid")]
#[command(version)]
#[command(about = "HTTP service for student grades (nilai mahasiswa)", long_about = None)]
pub struct ServiceConfig {
    /// SQLite database file holding mahasiswa, matakuliah and perkuliahan
    #[arg(long, env = "NILAI_DATABASE")]
    pub database: PathBuf,

    /// Address to listen on
    #[arg(long, env = "NILAI_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Upper bound for a single store call, in milliseconds
    #[arg(long, env = "NILAI_STORE_TIMEOUT_MS", default_value_t = 5000)]
    pub store_timeout_ms: u64,

    /// What a grade read does when a row cannot be decoded
    #[arg(long, env = "NILAI_ON_ROW_ERROR", value_enum, default_value_t = RowErrorPolicy::Partial)]
    pub on_row_error: RowErrorPolicy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NILAI_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "NILAI_JSON_LOGS")]
    pub json_logs: bool,
}

impl ServiceConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_database_is_given() {
        let cfg = ServiceConfig::try_parse_from(["nilaid", "--database", "grades.sqlite3"])
            .expect("parse args");
        assert_eq!(cfg.database, PathBuf::from("grades.sqlite3"));
        assert_eq!(cfg.listen, "0.0.0.0:8080".parse::<SocketAddr>().expect("addr"));
        assert_eq!(cfg.store_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.on_row_error, RowErrorPolicy::Partial);
        assert!(!cfg.json_logs);
    }

    #[test]
    fn row_error_policy_parses_fail() {
        let cfg = ServiceConfig::try_parse_from([
            "nilaid",
            "--database",
            "g.db",
            "--on-row-error",
            "fail",
            "--store-timeout-ms",
            "250",
        ])
        .expect("parse args");
        assert_eq!(cfg.on_row_error, RowErrorPolicy::Fail);
        assert_eq!(cfg.store_timeout(), Duration::from_millis(250));
    }
}
