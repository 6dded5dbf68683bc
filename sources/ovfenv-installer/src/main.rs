/*!
# Introduction

ovfenv-installer configures a VMware guest from the vSphere OVF environment (`guestinfo.ovfenv`).

It reads the environment through open-vm-tools and uses the deploy-time properties to write:
* `/etc/sysconfig/network-scripts/ifcfg-ethN` for every virtual NIC, static when `ipN` is set and
  DHCP otherwise (`gatewayN` and `subnetN` complete a static address)
* `/etc/hostname` from `hostname`
* `/etc/resolv.conf` from `domain`, `dnssearch` and `dns0`..`dns4`
* `/etc/ntp.conf` from `ntp0`..`ntp4`, if ntpd is installed

and then restarts the affected services.

It is meant to run at boot, for example from `/etc/rc.d/rc.local`:
```
ovfenv-installer --run-once --log-file=/var/log/ovfenv-installer.log
```
With `--run-once`, a marker file is written after a successful run and later runs exit
immediately while it exists.

Output paths can be changed with a TOML file passed to `--config`:
```toml
network-scripts-dir = "/etc/sysconfig/network-scripts"
hostname-file = "/etc/hostname"
resolv-conf = "/etc/resolv.conf"
ntp-conf = "/etc/ntp.conf"
marker-file = "/etc/ovfenv-installer.done"
```
*/

#![deny(rust_2018_idioms)]

#[macro_use]
extern crate log;

mod config;
mod dns;
mod guestinfo;
mod hostname;
mod network;
mod ntp;
mod ovf;
mod system;

use argh::FromArgs;
use config::InstallerConfig;
use ovf::OvfEnvironment;
use simplelog::{
    ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};
use snafu::ResultExt;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process;
use system::{Host, SystemCommands};

/// Configure networking from vSphere ovfEnv properties
#[derive(FromArgs, PartialEq, Debug)]
struct Args {
    /// run once only
    #[argh(switch)]
    run_once: bool,

    /// save log to file
    #[argh(option)]
    log_file: Option<PathBuf>,

    /// log-level trace|debug|info|warn|error
    #[argh(option, default = "LevelFilter::Info")]
    log_level: LevelFilter,

    /// TOML file overriding the paths written to
    #[argh(option)]
    config: Option<PathBuf>,

    /// print the version and exit
    #[argh(switch)]
    version: bool,
}

fn setup_logging(args: &Args) -> Result<()> {
    match &args.log_file {
        Some(path) => {
            let file = File::create(path).context(error::LogFileCreateSnafu { path })?;
            println!("see log: {}", path.display());
            WriteLogger::init(args.log_level, LogConfig::default(), file)
                .context(error::LoggerSnafu)
        }
        // TerminalMode::Mixed will send errors to stderr and anything less to stdout.
        None => TermLogger::init(
            args.log_level,
            LogConfig::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
        .context(error::LoggerSnafu),
    }
}

/// Fetch and parse the OVF environment, then run every configurator in turn.
fn install(config: &InstallerConfig, system: &dyn SystemCommands) -> Result<()> {
    info!("generating ovfenv ...");
    let xml = guestinfo::fetch_ovf_env(system).context(error::GuestInfoSnafu)?;
    info!("{}", xml.trim());

    info!("parsing ovfenv ...");
    let env = OvfEnvironment::from_xml(&xml).context(error::OvfSnafu)?;

    network::configure(&env.properties, env.adapter_count, config, system)
        .context(error::NetworkSnafu)?;
    hostname::configure(&env.properties, config, system).context(error::HostnameSnafu)?;
    dns::configure(&env.properties, config).context(error::DnsSnafu)?;
    ntp::configure(&env.properties, config, system).context(error::NtpSnafu)?;
    Ok(())
}

/// Run the installer and leave the marker behind so `--run-once` skips future runs.  The marker
/// is only written if every step succeeded.
fn install_once(config: &InstallerConfig, system: &dyn SystemCommands) -> Result<()> {
    install(config, system)?;
    fs::write(&config.marker_file, "done").unwrap_or_else(|e| {
        warn!(
            "Failed to create marker file {}, may unexpectedly run again: {}",
            config.marker_file.display(),
            e
        )
    });
    Ok(())
}

fn run() -> Result<()> {
    let args: Args = argh::from_env();
    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = InstallerConfig::load(args.config.as_deref()).context(error::ConfigSnafu)?;

    if args.run_once && config.marker_file.exists() {
        println!("skipped to run again in --run-once mode");
        return Ok(());
    }

    setup_logging(&args)?;

    let result = if args.run_once {
        install_once(&config, &Host)
    } else {
        install(&config, &Host)
    };
    if let Err(e) = result {
        // main prints the error to the terminal; make sure the log file has it as well
        if args.log_file.is_some() {
            error!("{}", e);
        }
        return Err(e);
    }

    info!("completed!");
    Ok(())
}

// Returning a Result from main makes it print a Debug representation of the error, but with Snafu
// we have nice Display representations of the error, so we wrap "main" (run) and print any error.
// https://github.com/shepmaster/snafu/issues/110
fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}

/// Potential errors during ovfenv-installer execution
mod error {
    use crate::{config, dns, guestinfo, hostname, network, ntp, ovf};
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Unable to load configuration: {}", source))]
        Config { source: config::Error },

        #[snafu(display("Failed to create log file '{}': {}", path.display(), source))]
        LogFileCreate { path: PathBuf, source: io::Error },

        #[snafu(display("Logger setup error: {}", source))]
        Logger { source: log::SetLoggerError },

        #[snafu(display("{}", source))]
        GuestInfo { source: guestinfo::Error },

        #[snafu(display("Failed to parse ovfenv: {}", source))]
        Ovf { source: ovf::Error },

        #[snafu(display("Failed to configure networking: {}", source))]
        Network { source: network::Error },

        #[snafu(display("Failed to configure hostname: {}", source))]
        Hostname { source: hostname::Error },

        #[snafu(display("Failed to configure DNS: {}", source))]
        Dns { source: dns::Error },

        #[snafu(display("Failed to configure NTP: {}", source))]
        Ntp { source: ntp::Error },
    }
}

type Result<T> = std::result::Result<T, error::Error>;
