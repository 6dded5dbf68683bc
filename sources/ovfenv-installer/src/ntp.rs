//! The ntp module configures ntpd with the `ntp0`..`ntp4` servers, if ntpd is installed.

use crate::config::InstallerConfig;
use crate::ovf::Properties;
use crate::system::{run_logged, SystemCommands};
use snafu::ResultExt;
use std::fmt::Write;
use std::fs;

const NTPD_BIN: &str = "ntpd";
/// Number of `ntp<N>` properties we look at
const MAX_NTP_SERVERS: usize = 5;

const NTP_CONF_HEADER: &str = "\
driftfile /var/lib/ntp/drift
restrict default nomodify notrap nopeer noquery
restrict 127.0.0.1
restrict ::1

";

const NTP_CONF_TRAILER: &str = "
includefile /etc/ntp/crypto/pw
keys /etc/ntp/keys
disable monitor
";

/// Build `ntp.conf` with a `server` line per configured NTP server.  Returns `None` if no servers
/// were configured, so we never replace a working config with a server-less one.
pub(crate) fn ntp_conf(properties: &Properties) -> Result<Option<String>> {
    let mut output = String::from(NTP_CONF_HEADER);

    let mut servers = 0;
    for index in 0..MAX_NTP_SERVERS {
        if let Some(server) = properties.indexed("ntp", index) {
            writeln!(output, "server {}", server).context(error::NtpConfBuildFailedSnafu)?;
            servers += 1;
        }
    }
    output.push_str(NTP_CONF_TRAILER);

    debug!("Found {} NTP server(s)", servers);
    Ok(Some(output).filter(|_| servers > 0))
}

pub(crate) fn configure(
    properties: &Properties,
    config: &InstallerConfig,
    system: &dyn SystemCommands,
) -> Result<()> {
    info!("configuring ntp ...");

    if system.find_program(NTPD_BIN).is_none() {
        info!("ntpd is not installed, skipped to configure ntp");
        return Ok(());
    }

    if let Some(output) = ntp_conf(properties)? {
        info!("writing {} ...", config.ntp_conf.display());
        fs::write(&config.ntp_conf, output).context(error::NtpConfWriteFailedSnafu {
            path: &config.ntp_conf,
        })?;

        run_logged(system, "systemctl", &["restart", "ntpd.service"]);
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
        #[snafu(display("Failed to build NTP configuration: {}", source))]
        NtpConfBuildFailed { source: std::fmt::Error },

        #[snafu(display("Failed to write NTP configuration to '{}': {}", path.display(), source))]
        NtpConfWriteFailed { path: PathBuf, source: io::Error },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::*;
    use crate::system::fake::FakeSystem;
    use tempfile::TempDir;

    #[test]
    fn servers_in_index_order() {
        let properties: Properties = vec![("ntp2", "time.example.com"), ("ntp0", "pool.ntp.org")]
            .into_iter()
            .collect();

        assert_eq!(
            ntp_conf(&properties).unwrap().unwrap(),
            "driftfile /var/lib/ntp/drift\n\
             restrict default nomodify notrap nopeer noquery\n\
             restrict 127.0.0.1\n\
             restrict ::1\n\
             \n\
             server pool.ntp.org\n\
             server time.example.com\n\
             \n\
             includefile /etc/ntp/crypto/pw\n\
             keys /etc/ntp/keys\n\
             disable monitor\n"
        );
    }

    #[test]
    fn no_servers_no_config() {
        let properties: Properties = vec![("ntp5", "ignored.example.com")].into_iter().collect();
        assert_eq!(ntp_conf(&properties).unwrap(), None);
    }

    #[test]
    fn written_and_restarted() {
        let dir = TempDir::new().unwrap();
        let config = InstallerConfig::rooted_at(dir.path());
        let system = FakeSystem::new().with_program("ntpd");
        let properties: Properties = vec![("ntp0", "pool.ntp.org")].into_iter().collect();

        configure(&properties, &config, &system).unwrap();

        let written = fs::read_to_string(&config.ntp_conf).unwrap();
        assert!(written.contains("\nserver pool.ntp.org\n"));
        assert_eq!(system.commands(), vec!["systemctl restart ntpd.service"]);
    }

    #[test]
    fn ntpd_not_installed() {
        let dir = TempDir::new().unwrap();
        let config = InstallerConfig::rooted_at(dir.path());
        let system = FakeSystem::new();
        let properties: Properties = vec![("ntp0", "pool.ntp.org")].into_iter().collect();

        configure(&properties, &config, &system).unwrap();

        assert!(!config.ntp_conf.exists());
        assert!(system.commands().is_empty());
    }

    #[test]
    fn no_servers_leaves_existing_config() {
        let dir = TempDir::new().unwrap();
        let config = InstallerConfig::rooted_at(dir.path());
        fs::write(&config.ntp_conf, "server 10.0.0.1\n").unwrap();
        let system = FakeSystem::new().with_program("ntpd");

        configure(&Properties::default(), &config, &system).unwrap();

        assert_eq!(
            fs::read_to_string(&config.ntp_conf).unwrap(),
            "server 10.0.0.1\n"
        );
        assert!(system.commands().is_empty());
    }
}
