use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chunkvault_gate::GateConfig;

use crate::error::{ServerError, ServerResult};

/// Longest accepted default call deadline: one day.
pub const MAX_CALL_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Static server configuration, fixed at process start.
///
/// Loaded from TOML; any field left out takes its default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory uploads are stored in.
    pub storage_root: PathBuf,
    #[serde(flatten)]
    pub gates: GateConfig,
    /// Largest accepted upload, in bytes.
    pub max_payload_size: usize,
    /// Deadline applied to calls that do not carry their own. Zero disables it.
    pub call_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 5001)),
            storage_root: PathBuf::from("./data"),
            gates: GateConfig::default(),
            max_payload_size: 1 << 20,
            call_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        self.gates
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        if self.max_payload_size == 0 {
            return Err(ServerError::Config("max_payload_size must be at least 1".into()));
        }
        if u32::try_from(self.max_payload_size).is_err() {
            return Err(ServerError::Config(format!(
                "max_payload_size must fit in 32 bits, got {}",
                self.max_payload_size
            )));
        }
        if self.call_timeout_secs > MAX_CALL_TIMEOUT_SECS {
            return Err(ServerError::Config(format!(
                "call_timeout_secs must be at most {MAX_CALL_TIMEOUT_SECS}, got {}",
                self.call_timeout_secs
            )));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:5001".parse::<SocketAddr>().unwrap());
        assert_eq!(c.max_payload_size, 1_048_576);
        assert_eq!(c.gates, GateConfig::default());
        assert_eq!(c.call_timeout(), Some(Duration::from_secs(30)));
        c.validate().unwrap();
    }

    #[test]
    fn partial_toml_takes_defaults() {
        let c: ServerConfig = toml::from_str(
            r#"
            storage_root = "/var/lib/chunkvault"
            max_upload_requests = 2
            "#,
        )
        .unwrap();
        assert_eq!(c.storage_root, PathBuf::from("/var/lib/chunkvault"));
        assert_eq!(c.gates.max_upload_requests, 2);
        assert_eq!(c.gates.max_read_requests, 16);
        assert_eq!(c.max_payload_size, 1 << 20);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunkvault.toml");
        std::fs::write(&path, "bind_addr = \"0.0.0.0:9000\"\ncall_timeout_secs = 0\n").unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.call_timeout(), None);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_read_requests = 0\n").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(ServerError::Config(_))));

        std::fs::write(&path, "max_payload_size = \"big\"\n").unwrap();
        assert!(matches!(ServerConfig::load(&path), Err(ServerError::Config(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ServerConfig::load(Path::new("/nonexistent/chunkvault.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
    }

    #[test]
    fn zero_payload_size_rejected() {
        let c = ServerConfig { max_payload_size: 0, ..Default::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn call_timeout_is_bounded() {
        let at_limit = ServerConfig { call_timeout_secs: MAX_CALL_TIMEOUT_SECS, ..Default::default() };
        at_limit.validate().unwrap();
        let huge = ServerConfig { call_timeout_secs: u64::MAX, ..Default::default() };
        assert!(matches!(huge.validate(), Err(ServerError::Config(_))));
    }
}
