//! The guestinfo module fetches the OVF environment from the hypervisor using whichever
//! open-vm-tools (or legacy VMware Tools) program is installed.

use crate::system::SystemCommands;
use snafu::{OptionExt, ResultExt};

/// A program that can read a guestinfo key, and the arguments that make it do so.
struct GuestInfoTool {
    program: &'static str,
    args: &'static [&'static str],
}

// Tried in order, the first one found on the search path wins
const GUESTINFO_TOOLS: &[GuestInfoTool] = &[
    GuestInfoTool {
        program: "vmtoolsd",
        args: &["--cmd", "info-get guestinfo.ovfenv"],
    },
    GuestInfoTool {
        program: "vmware-guestd",
        args: &["--cmd", "info-get guestinfo.ovfenv"],
    },
    GuestInfoTool {
        program: "vmware-rpctool",
        args: &["info-get guestinfo.ovfenv"],
    },
];

/// Return the raw OVF environment XML.
pub(crate) fn fetch_ovf_env(system: &dyn SystemCommands) -> Result<String> {
    let (tool, path) = GUESTINFO_TOOLS
        .iter()
        .find_map(|tool| system.find_program(tool.program).map(|path| (tool, path)))
        .context(error::ToolsNotInstalledSnafu {
            searched: GUESTINFO_TOOLS
                .iter()
                .map(|t| t.program)
                .collect::<Vec<_>>()
                .join(", "),
        })?;

    debug!("Reading guestinfo.ovfenv with '{}'", path.display());
    system
        .output(&path, tool.args)
        .context(error::GuestInfoSnafu {
            program: tool.program,
        })
}

mod error {
    use crate::system;
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Guest tools not installed, none of [{}] found in PATH", searched))]
        ToolsNotInstalled { searched: String },

        #[snafu(display("Failed to read guestinfo.ovfenv with '{}': {}", program, source))]
        GuestInfo {
            program: String,
            source: system::Error,
        },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::*;
    use crate::system::fake::FakeSystem;

    #[test]
    fn prefers_vmtoolsd() {
        let system = FakeSystem::new()
            .with_program("vmware-rpctool")
            .with_program("vmtoolsd")
            .with_stdout("<Environment/>");
        assert_eq!(fetch_ovf_env(&system).unwrap(), "<Environment/>");
        assert_eq!(
            system.commands(),
            vec!["/usr/bin/vmtoolsd --cmd info-get guestinfo.ovfenv"]
        );
    }

    #[test]
    fn falls_back_to_vmware_guestd() {
        let system = FakeSystem::new()
            .with_program("vmware-guestd")
            .with_program("vmware-rpctool");
        fetch_ovf_env(&system).unwrap();
        assert_eq!(
            system.commands(),
            vec!["/usr/bin/vmware-guestd --cmd info-get guestinfo.ovfenv"]
        );
    }

    #[test]
    fn falls_back_to_rpctool() {
        let system = FakeSystem::new().with_program("vmware-rpctool");
        fetch_ovf_env(&system).unwrap();
        assert_eq!(
            system.commands(),
            vec!["/usr/bin/vmware-rpctool info-get guestinfo.ovfenv"]
        );
    }

    #[test]
    fn no_tools_installed() {
        let system = FakeSystem::new().with_program("ntpd");
        let err = fetch_ovf_env(&system).unwrap_err();
        assert!(err.to_string().contains("Guest tools not installed"));
        assert!(system.commands().is_empty());
    }

    #[test]
    fn failing_tool_is_fatal() {
        let system = FakeSystem::new()
            .with_program("vmtoolsd")
            .with_failing_output("No value found");
        let err = fetch_ovf_env(&system).unwrap_err();
        assert!(matches!(err, Error::GuestInfo { .. }));
        assert!(err.to_string().contains("No value found"));
        assert_eq!(system.commands().len(), 1);
    }
}
