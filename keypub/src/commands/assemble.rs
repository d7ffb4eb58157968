use anyhow::Context as _;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use sequoia_openpgp::Result;

use crate::invocation::Invocation;
use crate::services::KeyService;
use crate::Error;

/// Moves the pending preamble into place, falling back to copying
/// across file systems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// Turns the pending preamble into the output file, followed by the
/// exported key.
///
/// Afterwards, neither the pending preamble nor the exported key
/// remain.
pub fn assemble(invocation: &Invocation, keys: &dyn KeyService) -> Result<()> {
    let pending = invocation.pending_path();
    let output = invocation.output_path();
    let export = invocation.export_path();

    if File::open(&pending).is_err() {
        return Err(Error::MissingPreamble(pending).into());
    }
    move_file(&pending, &output)
        .context(format!("Failed to move {:?} to {:?}", pending, output))?;
    log::info!("moved pending preamble to {}", output.display());

    keys.export_public_key(&invocation.key_id, &export)
        .context("Failed to export the public key")?;
    let mut key = File::open(&export)
        .map_err(|_| Error::Unreadable(export.clone()))?;
    if key.metadata()?.len() == 0 {
        drop(key);
        if let Err(e) = fs::remove_file(&export) {
            log::warn!("failed to remove {}: {}", export.display(), e);
        }
        return Err(Error::EmptyExport(export).into());
    }

    {
        let mut sink = OpenOptions::new().append(true).open(&output)
            .context(format!("Failed to open {:?}", output))?;
        io::copy(&mut key, &mut sink)
            .context(format!("Failed to append the key to {:?}", output))?;
    }

    if File::open(&output).is_err() {
        return Err(Error::Unreadable(output).into());
    }
    fs::remove_file(&export)
        .context(format!("Failed to remove {:?}", export))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::testing::{FakeKeys, KEY};

    #[test]
    fn preamble_then_key() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), None);
        fs::write(inv.pending_path(), "\nhello\n").unwrap();

        let keys = FakeKeys::default();
        assemble(&inv, &keys).unwrap();

        let mut expected = b"\nhello\n".to_vec();
        expected.extend_from_slice(KEY);
        assert_eq!(fs::read(inv.output_path()).unwrap(), expected);
        assert!(! inv.pending_path().exists());
        assert!(! inv.export_path().exists());
        assert_eq!(*keys.exports.borrow(), 1);
    }

    #[test]
    fn missing_preamble() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), None);
        let keys = FakeKeys::default();
        let err = assemble(&inv, &keys).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::MissingPreamble(_))));
        assert_eq!(*keys.exports.borrow(), 0);
        assert!(! inv.output_path().exists());
    }

    #[test]
    fn empty_export() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), Some("out.asc"));
        fs::write(inv.pending_path(), "\nhello\n").unwrap();
        let keys = FakeKeys { key: vec![], ..Default::default() };
        let err = assemble(&inv, &keys).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::EmptyExport(_))));
        assert!(! inv.export_path().exists());
    }

    #[test]
    fn replaces_an_old_output() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), None);
        fs::write(inv.output_path(), "stale").unwrap();
        fs::write(inv.pending_path(), "fresh\n").unwrap();
        assemble(&inv, &FakeKeys::default()).unwrap();
        assert!(fs::read(inv.output_path()).unwrap().starts_with(b"fresh\n-----"));
    }
}
