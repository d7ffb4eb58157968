use anyhow::Context as _;
use std::fs::File;

use sequoia_openpgp::Result;

use crate::invocation::Invocation;
use crate::services::SigningService;
use crate::Error;

/// Creates the detached signature over the output file.
pub fn sign(invocation: &Invocation, signer: &dyn SigningService) -> Result<()> {
    let output = invocation.output_path();
    if File::open(&output).is_err() {
        return Err(Error::Unreadable(output).into());
    }

    let signature = invocation.signature_path();
    signer.detached_sign(&invocation.key_id, &output, &signature)
        .context(format!("Failed to sign {:?}", output))?;
    log::info!("wrote signature {}", signature.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::testing::FakeSigner;

    #[test]
    fn signs_the_output() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), Some("foo.asc"));
        fs::write(inv.output_path(), "key").unwrap();

        let signer = FakeSigner::default();
        sign(&inv, &signer).unwrap();
        assert_eq!(*signer.calls.borrow(),
                   vec![("ABCD1234".to_string(),
                         tmp.path().join("foo.asc"),
                         tmp.path().join("foo.asc.sig.asc"))]);
        assert!(inv.signature_path().exists());
    }

    #[test]
    fn unreadable_output() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), None);
        let signer = FakeSigner::default();
        let err = sign(&inv, &signer).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::Unreadable(_))));
        assert!(signer.calls.borrow().is_empty());
        assert!(! inv.signature_path().exists());
    }
}
