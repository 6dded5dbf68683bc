//! The network module renders a `network-scripts` interface configuration file (`ifcfg-ethN`)
//! for every adapter in the OVF environment and hands the interfaces over to the legacy network
//! service.

use crate::config::InstallerConfig;
use crate::ovf::Properties;
use crate::system::{run_logged, SystemCommands};
use snafu::ResultExt;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const DEFAULT_NETMASK: &str = "255.255.255.0";

/// How an interface gets its address.
#[derive(Debug, PartialEq)]
enum Addressing {
    Static(StaticAddress),
    Dhcp,
}

#[derive(Debug, PartialEq)]
struct StaticAddress {
    ip_address: String,
    gateway: Option<String>,
    netmask: String,
}

/// Configuration for the interface `eth<index>`.
#[derive(Debug, PartialEq)]
pub(crate) struct IfcfgInterface {
    index: usize,
    addressing: Addressing,
}

impl IfcfgInterface {
    /// Build the interface from the `ip<N>`, `gateway<N>` and `subnet<N>` properties.  Without an
    /// `ip<N>` the interface uses DHCP.
    pub(crate) fn from_properties(properties: &Properties, index: usize) -> Self {
        let addressing = match properties.indexed("ip", index) {
            Some(ip) => {
                let gateway = match properties.indexed("gateway", index) {
                    Some(gateway) => Some(gateway.to_string()),
                    // Only the primary interface gets a guessed gateway
                    None if index == 0 => synthesize_gateway(ip),
                    None => None,
                };
                let netmask = properties
                    .indexed("subnet", index)
                    .unwrap_or(DEFAULT_NETMASK)
                    .to_string();

                Addressing::Static(StaticAddress {
                    ip_address: ip.to_string(),
                    gateway,
                    netmask,
                })
            }
            None => Addressing::Dhcp,
        };

        IfcfgInterface { index, addressing }
    }

    pub(crate) fn name(&self) -> String {
        format!("eth{}", self.index)
    }

    /// Only the primary interface carries the default route
    fn default_route(&self) -> &'static str {
        if self.index == 0 {
            "yes"
        } else {
            "no"
        }
    }

    /// Render the contents of the interface's `ifcfg` file.
    pub(crate) fn render(&self) -> Result<String> {
        let name = self.name();
        let mut output = String::new();

        writeln!(output, "NAME={}", name).context(error::IfcfgBuildSnafu { interface: &name })?;
        writeln!(output, "DEVICE={}", name)
            .context(error::IfcfgBuildSnafu { interface: &name })?;
        output.push_str("TYPE=Ethernet\n");
        output.push_str("ONBOOT=yes\n");

        match &self.addressing {
            Addressing::Static(address) => {
                output.push_str("BOOTPROTO=static\n");
                writeln!(output, "IPADDR={}", address.ip_address)
                    .context(error::IfcfgBuildSnafu { interface: &name })?;
                if let Some(gateway) = &address.gateway {
                    writeln!(output, "GATEWAY={}", gateway)
                        .context(error::IfcfgBuildSnafu { interface: &name })?;
                }
                writeln!(output, "NETMASK={}", address.netmask)
                    .context(error::IfcfgBuildSnafu { interface: &name })?;
            }
            // Operators expect the static fields to be present, commented out, in DHCP configs
            Addressing::Dhcp => {
                output.push_str("BOOTPROTO=dhcp\n");
                output.push_str("#BOOTPROTO=static\n");
                output.push_str("#IPADDR=\n");
                output.push_str("#GATEWAY=\n");
                writeln!(output, "#NETMASK={}", DEFAULT_NETMASK)
                    .context(error::IfcfgBuildSnafu { interface: &name })?;
            }
        }

        output.push_str("IPV6INIT=no\n");
        writeln!(output, "DEFROUTE={}", self.default_route())
            .context(error::IfcfgBuildSnafu { interface: &name })?;
        output.push_str("PEERDNS=no\n");
        output.push_str("NM_CONTROLLED=no\n");

        Ok(output)
    }

    /// Render and write the interface's configuration file to `path`
    pub(crate) fn write_config_file<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let ifcfg = self.render()?;
        info!("writing {} ...", path.display());
        fs::write(path, ifcfg).context(error::IfcfgWriteSnafu { path })
    }
}

/// Replace the last octet of an IPv4 address with `1`, e.g. 192.168.1.50 -> 192.168.1.1
fn synthesize_gateway(ip: &str) -> Option<String> {
    match ip.rsplit_once('.') {
        Some((network, _)) => Some(format!("{}.1", network)),
        None => {
            warn!("Unable to guess a gateway for '{}', leaving it unset", ip);
            None
        }
    }
}

/// Write an `ifcfg` file for each of the `adapter_count` adapters, then swap NetworkManager out
/// for the legacy network service so the files take effect.
pub(crate) fn configure(
    properties: &Properties,
    adapter_count: usize,
    config: &InstallerConfig,
    system: &dyn SystemCommands,
) -> Result<()> {
    info!("configuring networking ...");
    if adapter_count == 0 {
        return Ok(());
    }

    fs::create_dir_all(&config.network_scripts_dir).context(error::CreateDirSnafu {
        path: &config.network_scripts_dir,
    })?;

    for index in 0..adapter_count {
        let interface = IfcfgInterface::from_properties(properties, index);
        debug!("{} uses {:?}", interface.name(), interface.addressing);
        interface.write_config_file(config.ifcfg_path(index))?;
    }

    run_logged(system, "systemctl", &["stop", "NetworkManager.service"]);
    run_logged(system, "systemctl", &["disable", "NetworkManager.service"]);
    run_logged(system, "systemctl", &["restart", "network.service"]);

    Ok(())
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to create '{}': {}", path.display(), source))]
        CreateDir { path: PathBuf, source: io::Error },

        #[snafu(display("Failed to build configuration for '{}': {}", interface, source))]
        IfcfgBuild {
            interface: String,
            source: std::fmt::Error,
        },

        #[snafu(display("Failed to write network configuration to '{}': {}", path.display(), source))]
        IfcfgWrite { path: PathBuf, source: io::Error },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
