//! Text assets loaded once at startup
//!
//! The install script, version and robots text are read into memory when the
//! service starts and never touched again, so a bad assets directory fails
//! startup instead of individual requests.

use crate::config::{AssetsConfig, ProductConfig};
use crate::error::{Error, Result};
use regex::{NoExpand, Regex};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

const INSTALL_SCRIPT_FILE: &str = "install.sh";
const VERSION_FILE: &str = "VERSION";
const ROBOTS_FILE: &str = "robots.txt";

/// In-memory copy of every served text asset
#[derive(Clone, Debug)]
pub struct Assets {
    /// Main install script template
    pub install_script: String,
    /// Current release version, trimmed
    pub version: String,
    /// robots.txt contents, trimmed
    pub robots: String,
    /// Additional products served under their own prefixes
    pub products: Vec<Product>,
}

/// An additional product's script and version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    /// Route prefix (e.g. "radar", "ext/hub")
    pub prefix: String,
    /// Install script template, empty when the file is missing
    pub install_script: String,
    /// Version text, or the configured default when the file is missing
    pub version: String,
    /// Whether OS, ARCH and FORCE are substituted
    pub platform_params: bool,
}

/// Query parameters accepted by the install script routes
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct InstallParams {
    /// Value for `VERSION="..."`
    pub version: Option<String>,
    /// Value for `DIRECTORY="..."`
    pub directory: Option<String>,
    /// Value for `OS="..."`
    pub os: Option<String>,
    /// Value for `ARCH="..."`
    pub arch: Option<String>,
    /// Value for `FORCE="..."`
    pub force: Option<String>,
}

impl InstallParams {
    /// Keep only `version` and `directory`
    pub fn without_platform(self) -> Self {
        Self {
            version: self.version,
            directory: self.directory,
            ..Self::default()
        }
    }
}

impl Assets {
    /// Read every asset from `config.dir`
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `install.sh`, `VERSION` or `robots.txt` is missing.
    /// Product files are optional.
    pub fn load(config: &AssetsConfig) -> Result<Self> {
        let dir = config.dir.as_path();
        let install_script = read_required(dir, INSTALL_SCRIPT_FILE)?;
        let version = read_required(dir, VERSION_FILE)?.trim().to_string();
        let robots = read_required(dir, ROBOTS_FILE)?.trim().to_string();

        let products = config
            .products
            .iter()
            .map(|product| Product::load(dir, product))
            .collect::<Vec<_>>();

        info!(
            dir = %dir.display(),
            version = %version,
            products = products.len(),
            "loaded assets"
        );

        Ok(Self {
            install_script,
            version,
            robots,
            products,
        })
    }

    /// Find a product by its route prefix
    pub fn product(&self, prefix: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.prefix == prefix)
    }
}

impl Product {
    fn load(assets_dir: &Path, config: &ProductConfig) -> Self {
        let dir = assets_dir.join(&config.prefix);

        let install_script = match std::fs::read_to_string(dir.join(INSTALL_SCRIPT_FILE)) {
            Ok(script) => script,
            Err(e) => {
                warn!(product = %config.prefix, error = %e, "product install script unavailable, serving empty script");
                String::new()
            }
        };
        let version = match std::fs::read_to_string(dir.join(VERSION_FILE)) {
            Ok(version) => version.trim().to_string(),
            Err(_) => config.default_version.clone(),
        };

        Self {
            prefix: config.prefix.clone(),
            install_script,
            version,
            platform_params: config.platform_params,
        }
    }

    /// Render this product's script, dropping platform params it does not accept
    pub fn render(&self, params: InstallParams) -> Result<String> {
        let params = if self.platform_params {
            params
        } else {
            params.without_platform()
        };
        render_install_script(&self.install_script, &params)
    }
}

fn read_required(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::read_to_string(&path).map_err(|e| Error::Config {
        message: format!("failed to read asset '{}': {}", path.display(), e),
        key: Some("assets.dir".to_string()),
    })
}

/// Substitute `KEY="..."` assignments in an install script
///
/// Each supplied parameter replaces every `KEY="<anything>"` with
/// `KEY="<value>"`. Absent parameters leave the script untouched. Values that
/// could break out of the double-quoted shell string are ignored.
pub fn render_install_script(script: &str, params: &InstallParams) -> Result<String> {
    let mut rendered = script.to_string();

    for (key, value) in [
        ("VERSION", &params.version),
        ("OS", &params.os),
        ("ARCH", &params.arch),
        ("DIRECTORY", &params.directory),
        ("FORCE", &params.force),
    ] {
        let Some(value) = value else { continue };
        if !is_shell_safe(value) {
            warn!(key, "ignoring install parameter with shell metacharacters");
            continue;
        }

        let pattern = Regex::new(&format!(r#"{}="[^"]*""#, key))
            .map_err(|e| Error::ApiServerError(format!("invalid {} pattern: {}", key, e)))?;
        let replacement = format!("{}=\"{}\"", key, value);
        rendered = pattern
            .replace_all(&rendered, NoExpand(&replacement))
            .into_owned();
    }

    Ok(rendered)
}

/// Whether `value` can sit inside a double-quoted shell string as a literal
fn is_shell_safe(value: &str) -> bool {
    !value
        .chars()
        .any(|c| matches!(c, '"' | '\\' | '$' | '`' | '\n' | '\r'))
}
