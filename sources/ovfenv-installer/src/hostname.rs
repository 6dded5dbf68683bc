//! The hostname module persists the `hostname` property and applies it to the running system.

use crate::config::InstallerConfig;
use crate::ovf::Properties;
use crate::system::{run_logged, SystemCommands};
use snafu::ResultExt;
use std::fs;

/// Persist the `hostname` property and apply it to the running system.
pub(crate) fn configure(
    properties: &Properties,
    config: &InstallerConfig,
    system: &dyn SystemCommands,
) -> Result<()> {
    info!("configuring hostname ...");
    let hostname = match properties.get("hostname") {
        Some(hostname) => hostname,
        None => return Ok(()),
    };

    // static
    info!("writing {} ...", config.hostname_file.display());
    fs::write(&config.hostname_file, hostname).context(error::HostnameWriteFailedSnafu {
        path: &config.hostname_file,
    })?;

    // transient
    run_logged(system, "hostname", &[hostname]);
    Ok(())
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to write hostname to '{}': {}", path.display(), source))]
        HostnameWriteFailed { path: PathBuf, source: io::Error },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
