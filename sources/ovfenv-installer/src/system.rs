//! The system module owns the `SystemCommands` trait, the seam between the configurators and the
//! programs they look up and run on the host.

use snafu::{ensure, ResultExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Everything the installer needs from the host besides the filesystem.
pub(crate) trait SystemCommands {
    /// Look up a program on the search path.
    fn find_program(&self, name: &str) -> Option<PathBuf>;

    /// Run a program to completion and return its standard output.  A non-zero exit is an error.
    fn output(&self, program: &Path, args: &[&str]) -> Result<String>;

    /// Run a program with inherited stdio, returning an error if it could not be started or did
    /// not exit successfully.
    fn run(&self, program: &str, args: &[&str]) -> Result<()>;
}

/// The real host, backed by `std::process::Command`.
pub(crate) struct Host;

impl SystemCommands for Host {
    fn find_program(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    fn output(&self, program: &Path, args: &[&str]) -> Result<String> {
        let command_line = command_line(&program.display().to_string(), args);
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .context(error::ExecutionFailureSnafu {
                command: &command_line,
            })?;

        ensure!(
            output.status.success(),
            error::CommandFailureSnafu {
                command: &command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr),
            }
        );

        String::from_utf8(output.stdout).context(error::OutputUtf8Snafu {
            command: command_line,
        })
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let command_line = command_line(program, args);
        let status = Command::new(program)
            .args(args)
            .status()
            .context(error::ExecutionFailureSnafu {
                command: &command_line,
            })?;

        ensure!(
            status.success(),
            error::CommandFailureSnafu {
                command: command_line,
                status: status.to_string(),
                stderr: "",
            }
        );
        Ok(())
    }
}

/// Run a command whose outcome doesn't stop the installer.  Failures are logged as warnings and
/// otherwise ignored.
pub(crate) fn run_logged(system: &dyn SystemCommands, program: &str, args: &[&str]) {
    info!("executing: {} ...", command_line(program, args));
    if let Err(e) = system.run(program, args) {
        warn!("{}", e);
    }
}

pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to execute '{}': {}", command, source))]
        ExecutionFailure {
            command: String,
            source: std::io::Error,
        },

        #[snafu(display("'{}' failed ({}): {}", command, status, stderr))]
        CommandFailure {
            command: String,
            status: String,
            stderr: String,
        },

        #[snafu(display("Invalid (non-utf8) output from '{}': {}", command, source))]
        OutputUtf8 {
            command: String,
            source: std::string::FromUtf8Error,
        },
    }
}

pub(crate) use error::Error;
pub(crate) type Result<T> = std::result::Result<T, error::Error>;
