//! Configuration types for dotenvx-sh
//!
//! Configuration is loaded once at startup (optional JSON file, then
//! environment overrides) and shared read-only afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// HTTP listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// The distributed command-line tool
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Binary name inside the vendor archives (default: "dotenvx")
    #[serde(default = "default_tool_name")]
    pub name: String,

    /// Registry scope the per-platform packages are published under (default: "dotenvx")
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            name: default_tool_name(),
            scope: default_scope(),
        }
    }
}

/// Upstream hosts the service talks to
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Package registry base URL (default: "https://registry.npmjs.org")
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Release host used in proxy mode (default: "https://dotenvx.com/releases")
    #[serde(default = "default_releases_url")]
    pub releases_url: String,

    /// Download statistics API base URL (default: "https://api.npmjs.org")
    #[serde(default = "default_stats_api_url")]
    pub stats_api_url: String,

    /// Timeout for any single upstream request, in seconds (default: 60)
    #[serde(
        default = "default_upstream_timeout",
        with = "duration_serde",
        rename = "timeout_secs"
    )]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            releases_url: default_releases_url(),
            stats_api_url: default_stats_api_url(),
            timeout: default_upstream_timeout(),
        }
    }
}

/// How `GET /{os}/{arch}` is served
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Always fetch from the registry and repackage locally
    #[default]
    Repackage,
    /// Always stream the prebuilt archive from the release host
    Proxy,
    /// Proxy when the caller gave no version, repackage otherwise
    ProxyUnversioned,
}

impl DownloadMode {
    /// Whether a request should be proxied rather than repackaged
    pub fn should_proxy(self, version_requested: bool) -> bool {
        match self {
            DownloadMode::Repackage => false,
            DownloadMode::Proxy => true,
            DownloadMode::ProxyUnversioned => !version_requested,
        }
    }
}

impl FromStr for DownloadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "repackage" => Ok(DownloadMode::Repackage),
            "proxy" => Ok(DownloadMode::Proxy),
            "proxy_unversioned" | "proxy-unversioned" => Ok(DownloadMode::ProxyUnversioned),
            other => Err(Error::Config {
                message: format!("unknown download mode '{}'", other),
                key: Some("download.mode".to_string()),
            }),
        }
    }
}

/// Which backend performs extraction and repackaging
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiverKind {
    /// In-process tar + gzip
    #[default]
    Native,
    /// The system `tar` binary
    Tar,
}

impl FromStr for ArchiverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(ArchiverKind::Native),
            "tar" => Ok(ArchiverKind::Tar),
            other => Err(Error::Config {
                message: format!("unknown archiver '{}'", other),
                key: Some("download.archiver".to_string()),
            }),
        }
    }
}

/// Download pipeline behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Repackage, proxy, or proxy only unversioned requests
    #[serde(default)]
    pub mode: DownloadMode,

    /// Extraction/repackaging backend
    #[serde(default)]
    pub archiver: ArchiverKind,

    /// Parent directory for per-request workspaces (None = system temp dir)
    #[serde(default)]
    pub workspace_dir: Option<PathBuf>,

    /// Path to the tar executable (auto-detected if None)
    #[serde(default)]
    pub tar_path: Option<PathBuf>,

    /// Upper bound for one external tool invocation, in seconds (default: 120)
    #[serde(
        default = "default_tool_timeout",
        with = "duration_serde",
        rename = "tool_timeout_secs"
    )]
    pub tool_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            mode: DownloadMode::default(),
            archiver: ArchiverKind::default(),
            workspace_dir: None,
            tar_path: None,
            tool_timeout: default_tool_timeout(),
        }
    }
}

/// An additional product with its own install script and version
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Route prefix and asset subdirectory (e.g. "radar", "ext/hub")
    pub prefix: String,

    /// Version reported when `<prefix>/VERSION` is missing
    #[serde(default = "default_product_version")]
    pub default_version: String,

    /// Whether the script accepts OS, ARCH and FORCE substitution
    #[serde(default = "default_true")]
    pub platform_params: bool,
}

/// Startup-loaded text assets
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory containing install.sh, VERSION and robots.txt (default: "./assets")
    #[serde(default = "default_assets_dir")]
    pub dir: PathBuf,

    /// Additional products served under their own prefixes
    #[serde(default = "default_products")]
    pub products: Vec<ProductConfig>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
            products: default_products(),
        }
    }
}

/// Per-platform architectures whose registry packages feed the stats badge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsPlatform {
    /// Operating system token (e.g. "linux")
    pub os: String,
    /// Architecture tokens published for this OS
    pub arches: Vec<String>,
}

/// Download statistics configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Package matrix to aggregate
    #[serde(default = "default_stats_platforms")]
    pub platforms: Vec<StatsPlatform>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            platforms: default_stats_platforms(),
        }
    }
}

/// Main configuration for the installer service
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Distributed tool identity
    #[serde(default)]
    pub tool: ToolConfig,

    /// Registry, release host and stats API
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Download pipeline behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Startup-loaded text assets
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Download statistics
    #[serde(default)]
    pub stats: StatsConfig,
}

impl Config {
    /// Read a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })?;
        Ok(config)
    }

    /// Build the configuration from an optional file plus process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup function
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.server.bind_address = parse_env("BIND_ADDRESS", &addr)?;
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = parse_env("PORT", &port)?;
            self.server.bind_address.set_port(port);
        }
        if let Some(dir) = lookup("ASSETS_DIR") {
            self.assets.dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("REGISTRY_URL") {
            self.upstream.registry_url = url;
        }
        if let Some(url) = lookup("RELEASES_URL") {
            self.upstream.releases_url = url;
        }
        if let Some(url) = lookup("STATS_API_URL") {
            self.upstream.stats_api_url = url;
        }
        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS") {
            let secs: u64 = parse_env("UPSTREAM_TIMEOUT_SECS", &secs)?;
            self.upstream.timeout = Duration::from_secs(secs);
        }
        if let Some(mode) = lookup("DOWNLOAD_MODE") {
            self.download.mode = mode.parse()?;
        }
        if let Some(archiver) = lookup("ARCHIVER") {
            self.download.archiver = archiver.parse()?;
        }
        if let Some(dir) = lookup("WORKSPACE_DIR") {
            self.download.workspace_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Reject settings that would make every request fail
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("upstream.registry_url", &self.upstream.registry_url),
            ("upstream.releases_url", &self.upstream.releases_url),
            ("upstream.stats_api_url", &self.upstream.stats_api_url),
        ] {
            url::Url::parse(value).map_err(|e| Error::Config {
                message: format!("invalid URL '{}': {}", value, e),
                key: Some(key.to_string()),
            })?;
        }

        for (key, value) in [("tool.name", &self.tool.name), ("tool.scope", &self.tool.scope)] {
            if value.is_empty() || !value.chars().all(is_token_char) {
                return Err(Error::Config {
                    message: format!("'{}' must be a non-empty [a-z0-9._-] token", value),
                    key: Some(key.to_string()),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        let mut routes: std::collections::HashSet<String> =
            BUILTIN_ROUTES.iter().map(|r| r.to_string()).collect();
        for product in &self.assets.products {
            let prefix = product.prefix.as_str();
            let well_formed = !prefix.is_empty()
                && !prefix.starts_with('/')
                && !prefix.ends_with('/')
                && !prefix.contains("//")
                && prefix.chars().all(|c| is_token_char(c) || c == '/')
                && !prefix.split('/').any(|segment| segment.starts_with('.'));
            if !well_formed {
                return Err(Error::Config {
                    message: format!("invalid product prefix '{}'", prefix),
                    key: Some("assets.products".to_string()),
                });
            }
            if !seen.insert(prefix) {
                return Err(Error::Config {
                    message: format!("duplicate product prefix '{}'", prefix),
                    key: Some("assets.products".to_string()),
                });
            }
            for path in product_paths(prefix) {
                if !routes.insert(path.clone()) {
                    return Err(Error::Config {
                        message: format!(
                            "product prefix '{}' collides with route '{}'",
                            prefix, path
                        ),
                        key: Some("assets.products".to_string()),
                    });
                }
            }
        }

        if self.upstream.timeout.is_zero() {
            return Err(Error::Config {
                message: "timeout must be greater than zero".to_string(),
                key: Some("upstream.timeout_secs".to_string()),
            });
        }

        Ok(())
    }

    /// Directory under which per-request workspaces are created
    pub fn workspace_root(&self) -> PathBuf {
        self.download
            .workspace_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Fixed paths served by the router, excluding parameterized ones
pub(crate) const BUILTIN_ROUTES: &[&str] = &[
    "/",
    "/install.sh",
    "/installer.sh",
    "/VERSION",
    "/robots.txt",
    "/stats/curl",
    "/health",
];

/// Paths served for a product: script, script alias and version
pub(crate) fn product_paths(prefix: &str) -> [String; 3] {
    [
        format!("/{}", prefix),
        format!("/{}/install.sh", prefix),
        format!("/{}/VERSION", prefix),
    ]
}

/// Characters allowed in tool names and path tokens
pub(crate) fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| Error::Config {
        message: format!("invalid value '{}' for {}: {}", value, key, e),
        key: Some(key.to_string()),
    })
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_tool_name() -> String {
    "dotenvx".to_string()
}

fn default_scope() -> String {
    "dotenvx".to_string()
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_releases_url() -> String {
    "https://dotenvx.com/releases".to_string()
}

fn default_stats_api_url() -> String {
    "https://api.npmjs.org".to_string()
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_tool_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("./assets")
}

fn default_product_version() -> String {
    "0.1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_products() -> Vec<ProductConfig> {
    let product = |prefix: &str, default_version: &str, platform_params: bool| ProductConfig {
        prefix: prefix.to_string(),
        default_version: default_version.to_string(),
        platform_params,
    };

    vec![
        product("radar", "0.1.0", true),
        product("pro", "0.1.0", true),
        product("dotenv-enterprise", "0.1.0", true),
        product("ext/hub", "0.2.0", false),
        product("ext/vault", "0.1.0", false),
    ]
}

fn default_stats_platforms() -> Vec<StatsPlatform> {
    let platform = |os: &str, arches: &[&str]| StatsPlatform {
        os: os.to_string(),
        arches: arches.iter().map(|a| a.to_string()).collect(),
    };

    vec![
        platform("darwin", &["amd64", "arm64", "x86_64"]),
        platform("linux", &["aarch64", "amd64", "arm64", "x86_64"]),
        platform("windows", &["amd64", "x86_64"]),
    ]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
