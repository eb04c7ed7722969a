use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::upstream::PackageRef;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub helm: HelmConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelmConfig {
    #[serde(default = "default_helm_binary")]
    pub binary: String,
    #[serde(default)]
    pub kube_context: Option<String>,
    /// Forwarded as `HELM_DRIVER` (secret, configmap, sql...).
    #[serde(default)]
    pub driver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    #[serde(default = "default_upstream_web_url")]
    pub web_url: String,
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Extra chart pins, merged over the built-in presets.
    #[serde(default)]
    pub presets: BTreeMap<String, PackageRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub kube_context: Option<String>,
    pub api_base: Option<String>,
    pub refresh_interval_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/kubescout/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("failed parsing TOML config: {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(context) = overrides.kube_context {
            self.helm.kube_context = Some(context);
        }
        if let Some(api_base) = overrides.api_base {
            self.dashboard.api_base = api_base;
        }
        if let Some(secs) = overrides.refresh_interval_secs {
            self.dashboard.refresh_interval_secs = secs;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    /// Accepts IPv4, bare or bracketed IPv6, and resolvable host names.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        let host = self.server.host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.server.port));
        }
        (host, self.server.port)
            .to_socket_addrs()
            .with_context(|| format!("invalid bind host: {host}"))?
            .next()
            .ok_or_else(|| anyhow!("bind host {host} resolved to no addresses"))
    }

    pub fn default_template() -> String {
        let template = r#"[server]
host = "0.0.0.0"
port = 8080

[helm]
binary = "helm"
# kube_context = "my-cluster"
# driver = "secret"

[upstream]
base_url = "https://artifacthub.io/api/v1"
web_url = "https://artifacthub.io"
timeout_secs = 10
cache_ttl_secs = 900

# Pin charts whose name search is ambiguous.
# [upstream.presets.redis]
# repo = "bitnami"
# name = "redis"

[dashboard]
api_base = "http://localhost:8080/api/v1"
refresh_interval_secs = 60

[logging]
level = "info"
"#;
        template.to_string()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            binary: default_helm_binary(),
            kube_context: None,
            driver: None,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            web_url: default_upstream_web_url(),
            timeout_secs: default_upstream_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            presets: BTreeMap::new(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_helm_binary() -> String {
    "helm".to_string()
}

fn default_upstream_base_url() -> String {
    "https://artifacthub.io/api/v1".to_string()
}

fn default_upstream_web_url() -> String {
    "https://artifacthub.io".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    900
}

fn default_api_base() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, ConfigOverrides};

    #[test]
    fn template_parses_to_defaults() {
        let parsed = Config::parse(&Config::default_template()).expect("template must parse");
        let defaults = Config::default();
        assert_eq!(parsed.server.port, defaults.server.port);
        assert_eq!(parsed.upstream.base_url, defaults.upstream.base_url);
        assert_eq!(parsed.upstream.cache_ttl_secs, 900);
        assert_eq!(parsed.dashboard.refresh_interval_secs, 60);
        assert!(parsed.upstream.presets.is_empty());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let parsed = Config::parse(
            r#"
[server]
port = 9090

[upstream.presets.redis]
repo = "bitnami"
name = "redis"
"#,
        )
        .expect("parse failed");
        assert_eq!(parsed.server.port, 9090);
        assert_eq!(parsed.server.host, "0.0.0.0");
        assert_eq!(parsed.helm.binary, "helm");
        assert_eq!(parsed.upstream.presets["redis"].repo, "bitnami");
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            port: Some(3000),
            kube_context: Some("staging".to_string()),
            log_level: Some("debug".to_string()),
            ..ConfigOverrides::default()
        });
        assert_eq!(
            config.bind_address().expect("bind address"),
            "0.0.0.0:3000".parse().unwrap()
        );
        assert_eq!(config.helm.kube_context.as_deref(), Some("staging"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.dashboard.api_base, "http://localhost:8080/api/v1");
    }

    #[test]
    fn bind_address_accepts_ipv6_hosts() {
        let mut config = Config::default();
        config.server.host = "::".to_string();
        let addr = config.bind_address().expect("bind address");
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 8080);

        config.server.host = "[::1]".to_string();
        assert_eq!(
            config.bind_address().expect("bind address"),
            "[::1]:8080".parse().unwrap()
        );

        config.server.host = "not a host".to_string();
        assert!(config.bind_address().is_err());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("kubescout-does-not-exist/config.toml");
        let config = Config::load(Some(&path)).expect("load failed");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::parse("[server\nport = ").is_err());
    }
}
