//! Remote copy by way of an external `scp`.

use itertools::Itertools;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use sequoia_openpgp::Result;

use super::{run_interactive, RemoteCopy};
use crate::invocation::Destination;

pub struct Scp {
    program: OsString,
}

impl Scp {
    pub fn new<P: Into<OsString>>(program: P) -> Self {
        Scp { program: program.into() }
    }
}

impl Default for Scp {
    fn default() -> Self {
        Scp::new("scp")
    }
}

impl RemoteCopy for Scp {
    fn copy(&self, files: &[&Path], dest: &Destination) -> Result<()> {
        log::info!("copying {} to {}",
                   files.iter().map(|f| f.display()).join(", "), dest);
        run_interactive(Command::new(&self.program)
                        .args(files)
                        .arg(dest.as_ref()))
    }
}
