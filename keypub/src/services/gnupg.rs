//! Key export and signing by way of an external `gpg`.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use sequoia_openpgp::Result;

use super::{run_captured, run_interactive, tool_name, KeyService,
            SigningService};

pub struct GnuPG {
    program: OsString,
}

impl GnuPG {
    pub fn new<P: Into<OsString>>(program: P) -> Self {
        GnuPG { program: program.into() }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }
}

impl Default for GnuPG {
    fn default() -> Self {
        GnuPG::new("gpg")
    }
}

impl KeyService for GnuPG {
    fn fingerprint_command(&self, key_id: &str) -> String {
        format!("{} --fingerprint {}", tool_name(&self.program), key_id)
    }

    fn fingerprint(&self, key_id: &str) -> Result<String> {
        run_captured(self.command().arg("--fingerprint").arg(key_id))
    }

    fn export_public_key(&self, key_id: &str, dest: &Path) -> Result<()> {
        run_interactive(self.command()
                        .args(&["--armor", "--yes", "--output"])
                        .arg(dest)
                        .arg("--export")
                        .arg(key_id))
    }
}

impl SigningService for GnuPG {
    fn detached_sign(&self, key_id: &str, input: &Path, output: &Path)
                     -> Result<()> {
        // Inherit the terminal, gpg may need to ask for a passphrase.
        run_interactive(self.command()
                        .args(&["--armor", "--yes", "--local-user"])
                        .arg(key_id)
                        .arg("--output")
                        .arg(output)
                        .arg("--detach-sign")
                        .arg(input))
    }
}
