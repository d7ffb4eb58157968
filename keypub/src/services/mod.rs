//! The collaborators a run relies on.
//!
//! Key export, signing, and the remote copy are not done by keypub
//! itself.  They are reached through the traits in this module, with
//! one backend per external program or library.

use anyhow::Context as _;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use sequoia_openpgp::Result;

use crate::invocation::Destination;
use crate::Error;

pub mod gnupg;
pub mod scp;
pub mod sequoia;

/// Looks up and exports public keys.
pub trait KeyService {
    /// The command a reader can run to reproduce
    /// [`KeyService::fingerprint`].
    fn fingerprint_command(&self, key_id: &str) -> String;

    /// Returns the human-readable fingerprint listing of the key.
    fn fingerprint(&self, key_id: &str) -> Result<String>;

    /// Writes the ASCII-armored public key to `dest`.
    fn export_public_key(&self, key_id: &str, dest: &Path) -> Result<()>;
}

/// Creates detached signatures.
pub trait SigningService {
    /// Writes an ASCII-armored detached signature over `input`,
    /// made by `key_id`, to `output`.
    fn detached_sign(&self, key_id: &str, input: &Path, output: &Path)
                     -> Result<()>;
}

/// Copies files to a remote location.
pub trait RemoteCopy {
    fn copy(&self, files: &[&Path], dest: &Destination) -> Result<()>;
}

/// Returns a printable name for the program.
fn tool_name(program: &OsStr) -> String {
    Path::new(program).file_name()
        .unwrap_or(program)
        .to_string_lossy()
        .into_owned()
}

/// Runs the command attached to our terminal.
pub(crate) fn run_interactive(cmd: &mut Command) -> Result<()> {
    let tool = tool_name(cmd.get_program());
    log::debug!("running {:?}", cmd);
    let status = cmd.status()
        .with_context(|| format!("Failed to run {}", tool))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::ToolFailed { tool, status: status.code() }.into())
    }
}

/// Runs the command and returns what it wrote to stdout.
///
/// The command's stderr is passed through.
pub(crate) fn run_captured(cmd: &mut Command) -> Result<String> {
    let tool = tool_name(cmd.get_program());
    log::debug!("running {:?}", cmd);
    let output = cmd.stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("Failed to run {}", tool))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(Error::ToolFailed { tool, status: output.status.code() }.into())
    }
}
