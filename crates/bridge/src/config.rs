//! Bridge configuration

use crate::Cli;
use anyhow::{Context, Result};
use bridge_lib::nomad::DEFAULT_NOMAD_ADDR;
use bridge_lib::{SinkTarget, TlsSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Carbon plaintext listener, `host:port`
    #[serde(default = "default_graphite_addr")]
    pub graphite_addr: String,

    /// Nomad agent HTTP address
    #[serde(default = "default_nomad_addr")]
    pub nomad_addr: String,

    /// Client certificate for a TLS-enabled agent
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,

    /// Client key for a TLS-enabled agent
    #[serde(default)]
    pub tls_key: Option<PathBuf>,

    /// CA certificate used to verify the agent
    #[serde(default)]
    pub tls_ca_cert: Option<PathBuf>,

    /// Skip verification of the agent certificate
    #[serde(default)]
    pub tls_insecure: bool,

    /// Log metrics instead of sending them
    #[serde(default)]
    pub dry_run: bool,

    /// Collector connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,
}

fn default_graphite_addr() -> String {
    "127.0.0.1:2003".to_string()
}

fn default_nomad_addr() -> String {
    DEFAULT_NOMAD_ADDR.to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            graphite_addr: default_graphite_addr(),
            nomad_addr: default_nomad_addr(),
            tls_cert: None,
            tls_key: None,
            tls_ca_cert: None,
            tls_insecure: false,
            dry_run: false,
            connect_timeout_secs: default_connect_timeout(),
            log_json: false,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables use the `NOMAD_GRAPHITE_` prefix and win over
    /// the file.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("NOMAD_GRAPHITE").try_parsing(true))
            .build()
            .context("Failed to read configuration sources")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Apply command-line flags, which take precedence over everything else
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(addr) = &cli.graphite_addr {
            self.graphite_addr = addr.clone();
        }
        if let Some(addr) = &cli.addr {
            self.nomad_addr = addr.clone();
        }
        if let Some(path) = &cli.tls_cert {
            self.tls_cert = Some(path.clone());
        }
        if let Some(path) = &cli.tls_key {
            self.tls_key = Some(path.clone());
        }
        if let Some(path) = &cli.tls_ca_cert {
            self.tls_ca_cert = Some(path.clone());
        }
        if let Some(secs) = cli.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        self.tls_insecure |= cli.tls_insecure;
        self.dry_run |= cli.dry_run;
        self.log_json |= cli.log_json;
    }

    pub fn tls(&self) -> TlsSettings {
        TlsSettings {
            ca_cert: self.tls_ca_cert.clone(),
            client_cert: self.tls_cert.clone(),
            client_key: self.tls_key.clone(),
            insecure: self.tls_insecure,
        }
    }

    /// Where metrics go: the collector, or the log on a dry run
    pub fn sink_target(&self) -> SinkTarget {
        if self.dry_run {
            SinkTarget::Log
        } else {
            SinkTarget::Graphite {
                addr: self.graphite_addr.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.graphite_addr, "127.0.0.1:2003");
        assert_eq!(config.nomad_addr, "http://127.0.0.1:4646");
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(
            config.sink_target(),
            SinkTarget::Graphite {
                addr: "127.0.0.1:2003".to_string(),
                connect_timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(
            &path,
            r#"
graphite_addr = "carbon.internal:2003"
nomad_addr = "https://nomad.internal:4646"
tls_ca_cert = "/etc/nomad/ca.pem"
connect_timeout_secs = 2
"#,
        )
        .unwrap();

        let config = BridgeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.graphite_addr, "carbon.internal:2003");
        assert_eq!(config.nomad_addr, "https://nomad.internal:4646");
        assert_eq!(config.tls_ca_cert, Some(PathBuf::from("/etc/nomad/ca.pem")));
        assert_eq!(config.connect_timeout_secs, 2);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(BridgeConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "nomad-graphite",
            "--graphite-addr",
            "10.0.0.5:2003",
            "--addr",
            "https://127.0.0.1:4646",
            "--tls-cert",
            "/certs/client.pem",
            "--tls-key",
            "/certs/client-key.pem",
            "--tls-insecure",
            "--dry-run",
        ]);

        let mut config = BridgeConfig::default();
        config.apply_overrides(&cli);

        assert_eq!(config.graphite_addr, "10.0.0.5:2003");
        assert_eq!(config.nomad_addr, "https://127.0.0.1:4646");
        assert_eq!(config.sink_target(), SinkTarget::Log);

        let tls = config.tls();
        assert!(tls.has_identity());
        assert!(tls.insecure);
        assert!(tls.ca_cert.is_none());
    }

    #[test]
    fn test_absent_flags_keep_file_values() {
        let cli = Cli::parse_from(["nomad-graphite"]);
        let mut config = BridgeConfig {
            graphite_addr: "carbon:2003".to_string(),
            tls_insecure: true,
            ..Default::default()
        };
        config.apply_overrides(&cli);

        assert_eq!(config.graphite_addr, "carbon:2003");
        assert!(config.tls_insecure);
    }
}
