//! Probe primitives for locating an installed `devenv` executable.
//!
//! Two families exist:
//!
//! - Legacy installs (2010–2015) advertise themselves through a
//!   `VSnnnCOMNTOOLS` environment variable pointing at the `Common7\Tools`
//!   directory; the IDE lives next door under `Common7\IDE`.
//! - Modern installs (2017+) are found by the external `vswhere` locator,
//!   which emits line-oriented `key: value` text.
//!
//! A probe either yields a usable executable path or a reason it failed;
//! the resolver in [`crate::toolchain`] logs failures and moves on.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Why a single probe did not yield an executable.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The legacy install-root environment variable is unset or empty.
    #[error("%{name}% is not set")]
    EnvNotSet {
        /// The variable that was consulted.
        name: String,
    },

    /// The derived executable path does not exist.
    #[error("{} not found", path.display())]
    NotFound {
        /// The path that was checked.
        path: PathBuf,
    },

    /// The locator process could not be started.
    #[error("vswhere: {source}")]
    Locator { source: std::io::Error },

    /// The locator ran but its output had no product path line.
    #[error("vswhere output did not contain a product path")]
    NoProductPath,

    /// No probe strategy exists for the requested product year.
    #[error("no probe for Visual Studio {year}")]
    UnknownYear {
        /// The year that was requested.
        year: String,
    },
}

/// Known key prefix in `vswhere` output.
const PRODUCT_PATH_KEY: &str = "productPath: ";

/// Resolve `devenv.com` through a legacy `VSnnnCOMNTOOLS` variable.
///
/// The variable points at `…\Common7\Tools`; the IDE directory is obtained
/// by rewriting `Tools` to `IDE`, then joining `devenv.com` and checking it
/// exists.
pub fn devenv_from_env(name: &str) -> Result<PathBuf, ProbeError> {
    let value = std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProbeError::EnvNotSet { name: name.to_string() })?;

    let ide = value.replace("Tools", "IDE");
    let com = Path::new(&ide).join("devenv.com");
    if com.exists() {
        Ok(com)
    } else {
        Err(ProbeError::NotFound { path: com })
    }
}

/// Where the locator executable lives: the fixed installer location when
/// present, otherwise plain `vswhere` resolved through `PATH`.
fn locator_executable() -> PathBuf {
    let program_files =
        std::env::var("ProgramFiles(x86)").or_else(|_| std::env::var("ProgramFiles"));
    if let Ok(root) = program_files {
        let fixed = Path::new(&root)
            .join("Microsoft Visual Studio")
            .join("Installer")
            .join("vswhere.exe");
        if fixed.exists() {
            return fixed;
        }
    }
    PathBuf::from("vswhere")
}

/// Run the locator with the given arguments and extract the product path.
pub fn locator_product_path(args: &[&str]) -> Result<PathBuf, ProbeError> {
    let output = Command::new(locator_executable())
        .args(args)
        .output()
        .map_err(|source| ProbeError::Locator { source })?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    product_path_from_output(&stdout).ok_or(ProbeError::NoProductPath)
}

/// Extract the `productPath: ` value from locator output and rewrite its
/// extension to `.com`, the command-line variant of the IDE executable.
pub fn product_path_from_output(text: &str) -> Option<PathBuf> {
    for line in text.lines() {
        if let Some(exe) = line.strip_prefix(PRODUCT_PATH_KEY) {
            return Some(Path::new(exe.trim_end()).with_extension("com"));
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
