use sequoia_openpgp::Result;

use crate::invocation::Invocation;
use crate::services::RemoteCopy;

/// Copies the output file and its signature to the upload
/// destination, if there is one.
///
/// Returns whether anything was copied.
pub fn publish(invocation: &Invocation, remote: &dyn RemoteCopy) -> Result<bool> {
    let dest = match &invocation.upload {
        Some(dest) => dest,
        None => {
            log::info!("no upload destination, not copying");
            return Ok(false);
        }
    };

    let output = invocation.output_path();
    let signature = invocation.signature_path();
    remote.copy(&[output.as_path(), signature.as_path()], dest)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::testing::FakeRemote;

    #[test]
    fn copies_both_files_at_once() {
        let inv = Invocation::new("ABCD1234", "/home/alice", None)
            .with_upload(Some("alice@example.org:www".parse().unwrap()));
        let remote = FakeRemote::default();
        assert!(publish(&inv, &remote).unwrap());
        assert_eq!(*remote.calls.borrow(),
                   vec![(vec![PathBuf::from("/home/alice/ABCD1234.asc"),
                              PathBuf::from("/home/alice/ABCD1234.sig.asc")],
                         "alice@example.org:www".to_string())]);
    }

    #[test]
    fn nothing_to_do() {
        let inv = Invocation::new("ABCD1234", "/home/alice", None);
        let remote = FakeRemote::default();
        assert!(! publish(&inv, &remote).unwrap());
        assert!(remote.calls.borrow().is_empty());
    }

    #[test]
    fn failures_propagate() {
        let inv = Invocation::new("ABCD1234", "/home/alice", None)
            .with_upload(Some("example.org:www".parse().unwrap()));
        let remote = FakeRemote { fail: true, ..Default::default() };
        assert!(publish(&inv, &remote).is_err());
    }
}
