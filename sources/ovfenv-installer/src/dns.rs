//! The dns module writes the resolver configuration from the `domain`, `dnssearch` and
//! `dns0`..`dns4` properties.

use crate::config::InstallerConfig;
use crate::ovf::Properties;
use snafu::ResultExt;
use std::fmt::Write;
use std::fs;

/// Number of `dns<N>` properties we look at
const MAX_NAME_SERVERS: usize = 5;

/// Build the resolver configuration: domain, then search list, then name servers in property
/// order.  Returns `None` when none of the properties are set.
pub(crate) fn resolv_conf(properties: &Properties) -> Result<Option<String>> {
    let mut output = String::new();

    if let Some(domain) = properties.get("domain") {
        writeln!(output, "domain {}", domain).context(error::ResolvConfBuildFailedSnafu)?;
    }

    if let Some(search) = properties.get("dnssearch") {
        writeln!(output, "search {}", search).context(error::ResolvConfBuildFailedSnafu)?;
    }

    for index in 0..MAX_NAME_SERVERS {
        if let Some(name_server) = properties.indexed("dns", index) {
            writeln!(output, "nameserver {}", name_server)
                .context(error::ResolvConfBuildFailedSnafu)?;
        }
    }

    Ok(Some(output).filter(|o| !o.is_empty()))
}

/// Write resolver configuration for libc, leaving any existing file alone if there is nothing to
/// write.
pub(crate) fn configure(properties: &Properties, config: &InstallerConfig) -> Result<()> {
    info!("configuring dns ...");
    if let Some(output) = resolv_conf(properties)? {
        info!("writing {} ...", config.resolv_conf.display());
        fs::write(&config.resolv_conf, output).context(error::ResolvConfWriteFailedSnafu {
            path: &config.resolv_conf,
        })?;
    }
    Ok(())
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to build resolver configuration: {}", source))]
        ResolvConfBuildFailed { source: std::fmt::Error },

        #[snafu(display("Failed to write resolver configuration to '{}': {}", path.display(), source))]
        ResolvConfWriteFailed { path: PathBuf, source: io::Error },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn line_order() {
        let properties: Properties = vec![
            ("dns3", "9.9.9.9"),
            ("dns0", "8.8.8.8"),
            ("dnssearch", "corp.example.com example.com"),
            ("domain", "corp.example.com"),
            ("dns1", "8.8.4.4"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            resolv_conf(&properties).unwrap().unwrap(),
            "domain corp.example.com\n\
             search corp.example.com example.com\n\
             nameserver 8.8.8.8\n\
             nameserver 8.8.4.4\n\
             nameserver 9.9.9.9\n"
        );
    }

    #[test]
    fn only_five_name_servers() {
        let properties: Properties = vec![("dns4", "10.0.0.4"), ("dns5", "10.0.0.5")]
            .into_iter()
            .collect();
        assert_eq!(
            resolv_conf(&properties).unwrap().unwrap(),
            "nameserver 10.0.0.4\n"
        );
    }

    #[test]
    fn nothing_to_write() {
        let dir = TempDir::new().unwrap();
        let config = InstallerConfig::rooted_at(dir.path());
        fs::write(&config.resolv_conf, "nameserver 127.0.0.53\n").unwrap();
        let properties: Properties = vec![("hostname", "myhost"), ("domain", " ")]
            .into_iter()
            .collect();

        configure(&properties, &config).unwrap();

        assert_eq!(
            fs::read_to_string(&config.resolv_conf).unwrap(),
            "nameserver 127.0.0.53\n"
        );
    }

    #[test]
    fn overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let config = InstallerConfig::rooted_at(dir.path());
        fs::write(&config.resolv_conf, "nameserver 127.0.0.53\n").unwrap();
        let properties: Properties = vec![("dns0", "8.8.8.8")].into_iter().collect();

        configure(&properties, &config).unwrap();

        assert_eq!(
            fs::read_to_string(&config.resolv_conf).unwrap(),
            "nameserver 8.8.8.8\n"
        );
    }
}
