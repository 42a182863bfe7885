//! Server configuration.
//!
//! Layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. the TOML file named by `--config` (optional)
//! 3. `FSE_*` environment variables, with `__` between nested keys, e.g.
//!    `FSE_PORT=9000` or `FSE_INGEST__REQUIRE_KNOWN_KIND=true`

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use fse_ingest::IngestOptions;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub ingest:     IngestOptions,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf {
  PathBuf::from("~/.local/share/fse/fse.sqlite")
}

impl ServerConfig {
  /// Load from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::from_builder(
      config::Config::builder()
        .add_source(config::File::from(path).required(false)),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> anyhow::Result<Self> {
    let settings = builder
      .add_source(
        config::Environment::with_prefix("FSE")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read configuration")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};
  use fse_hl7::PairingRule;

  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    ServerConfig::from_builder(
      config::Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml)),
    )
    .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.ingest, IngestOptions::default());
    assert!(cfg.store_path.ends_with("fse/fse.sqlite"));
  }

  #[test]
  fn nested_ingest_section() {
    let cfg = from_toml(
      r##"
        port = 9000
        store_path = "/var/lib/fse/fse.sqlite"

        [ingest]
        pairing = "enclosing"
        require_known_kind = true

        [ingest.delimiters]
        field = "#"
      "##,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/fse/fse.sqlite"));
    assert!(cfg.ingest.require_known_kind);
    assert_eq!(cfg.ingest.pairing, PairingRule::Enclosing);
    assert_eq!(cfg.ingest.delimiters.field, '#');
    assert_eq!(cfg.ingest.delimiters.component, '^');
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/data/fse.sqlite")),
      PathBuf::from(home).join("data/fse.sqlite")
    );
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
