//! The config module contains the paths the installer writes to, and the code to load overrides
//! for them from a TOML file.

use serde::Deserialize;
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_NETWORK_SCRIPTS_DIR: &str = "/etc/sysconfig/network-scripts";
const DEFAULT_HOSTNAME_FILE: &str = "/etc/hostname";
const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";
const DEFAULT_NTP_CONF: &str = "/etc/ntp.conf";
// Presence of this file means a previous `--run-once` run completed
const DEFAULT_MARKER_FILE: &str = "/etc/ovfenv-installer.done";

/// Output locations for everything the installer writes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub(crate) struct InstallerConfig {
    pub(crate) network_scripts_dir: PathBuf,
    pub(crate) hostname_file: PathBuf,
    pub(crate) resolv_conf: PathBuf,
    pub(crate) ntp_conf: PathBuf,
    pub(crate) marker_file: PathBuf,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        InstallerConfig {
            network_scripts_dir: PathBuf::from(DEFAULT_NETWORK_SCRIPTS_DIR),
            hostname_file: PathBuf::from(DEFAULT_HOSTNAME_FILE),
            resolv_conf: PathBuf::from(DEFAULT_RESOLV_CONF),
            ntp_conf: PathBuf::from(DEFAULT_NTP_CONF),
            marker_file: PathBuf::from(DEFAULT_MARKER_FILE),
        }
    }
}

impl InstallerConfig {
    /// Read configuration from a TOML file; keys that aren't given keep their defaults.
    pub(crate) fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path).context(error::ConfigReadSnafu { path })?;
        toml::from_str(&config_str).context(error::ConfigParseSnafu { path })
    }

    /// Use the file at `path` if one was given, the built-in defaults otherwise.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Configuration file for the interface `eth<index>`
    pub(crate) fn ifcfg_path(&self, index: usize) -> PathBuf {
        self.network_scripts_dir.join(format!("ifcfg-eth{}", index))
    }

    /// Place every output under `dir`, keeping the default file names.  Used by tests.
    #[cfg(test)]
    pub(crate) fn rooted_at(dir: &Path) -> Self {
        InstallerConfig {
            network_scripts_dir: dir.join("network-scripts"),
            hostname_file: dir.join("hostname"),
            resolv_conf: dir.join("resolv.conf"),
            ntp_conf: dir.join("ntp.conf"),
            marker_file: dir.join("ovfenv-installer.done"),
        }
    }
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to read config file '{}': {}", path.display(), source))]
        ConfigRead { path: PathBuf, source: io::Error },

        #[snafu(display("Failed to parse config file '{}': {}", path.display(), source))]
        ConfigParse {
            path: PathBuf,
            source: toml::de::Error,
        },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
