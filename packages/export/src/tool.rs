//! External command invocation.

use std::ffi::{OsStr, OsString};
use std::process::Command;

use crate::ExportError;

/// A command line for an external GIS tool.
///
/// Built separately from running it so the argument lists can be checked
/// without the tools installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Starts a command line for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, lossily converted for display and tests.
    #[must_use]
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Runs the command and waits for it to finish.
    ///
    /// # Errors
    ///
    /// * [`ExportError::ToolMissing`] if the program cannot be started
    /// * [`ExportError::ToolFailed`] if it exits unsuccessfully
    pub fn run(&self) -> Result<(), ExportError> {
        log::debug!("Running {} {}", self.program, self.args_lossy().join(" "));

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| ExportError::ToolMissing {
                tool: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ExportError::ToolFailed {
                tool: self.program.clone(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

/// Runs `program` with `args`.
///
/// # Errors
///
/// See [`ToolCommand::run`].
pub fn run<I, S>(program: &str, args: I) -> Result<(), ExportError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    ToolCommand::new(program).args(args).run()
}
