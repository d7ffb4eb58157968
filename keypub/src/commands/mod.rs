use std::fs::File;

use sequoia_openpgp::Result;

use crate::invocation::Invocation;
use crate::services::{KeyService, RemoteCopy, SigningService};

pub mod preamble;
use self::preamble::{Clock, Prompter};
pub mod assemble;
pub use self::assemble::assemble;
pub mod sign;
pub use self::sign::sign;
pub mod publish;
pub use self::publish::publish;

/// How far a run got.
///
/// Only the pending preamble survives between runs, so
/// [`RunState::detect`] either finds nothing or a complete preamble.
/// An output file without a pending preamble may be half written and
/// is therefore never resumed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    NotStarted,
    PreambleComplete,
    Assembled,
    Signed,
    Published,
}

impl RunState {
    /// Detects where an earlier run stopped.
    pub fn detect(invocation: &Invocation) -> Self {
        if File::open(invocation.pending_path()).is_ok() {
            RunState::PreambleComplete
        } else {
            RunState::NotStarted
        }
    }
}

/// The collaborators of a run.
pub struct Services<'a> {
    pub keys: &'a dyn KeyService,
    pub signer: &'a dyn SigningService,
    pub remote: &'a dyn RemoteCopy,
}

/// Runs all stages, in order, and returns the state reached.
///
/// If a pending preamble is left from an interrupted run, the user is
/// not asked again and the run continues with assembling.
pub fn run(invocation: &Invocation, services: &Services,
           prompter: &mut dyn Prompter, clock: &dyn Clock)
           -> Result<RunState>
{
    invocation.check()?;
    let mut state = RunState::detect(invocation);

    if state == RunState::NotStarted {
        let preamble = preamble::build(invocation, services.keys,
                                       prompter, clock)?;
        preamble::write_pending(invocation, &preamble)?;
        state = RunState::PreambleComplete;
    } else {
        log::info!("{} exists, resuming", invocation.pending_path().display());
    }
    log::info!("{:?}", state);

    assemble(invocation, services.keys)?;
    state = RunState::Assembled;
    log::info!("{:?}", state);

    sign(invocation, services.signer)?;
    state = RunState::Signed;
    log::info!("{:?}", state);

    if publish(invocation, services.remote)? {
        state = RunState::Published;
        log::info!("{:?}", state);
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::testing::{FakeKeys, FakeRemote, FakeSigner, FixedClock,
                         Script, KEY};

    struct Fakes {
        keys: FakeKeys,
        signer: FakeSigner,
        remote: FakeRemote,
    }

    impl Fakes {
        fn new() -> Self {
            Fakes {
                keys: FakeKeys::default(),
                signer: FakeSigner::default(),
                remote: FakeRemote::default(),
            }
        }

        fn services(&self) -> Services {
            Services {
                keys: &self.keys,
                signer: &self.signer,
                remote: &self.remote,
            }
        }
    }

    fn names(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir).unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn full_run() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), None);
        let fakes = Fakes::new();
        let mut script = Script::new(&["n", "n"]);

        assert_eq!(RunState::detect(&inv), RunState::NotStarted);
        let state = run(&inv, &fakes.services(), &mut script,
                        &FixedClock::default()).unwrap();
        assert_eq!(state, RunState::Signed);

        assert_eq!(names(tmp.path()),
                   vec!["ABCD1234.asc", "ABCD1234.sig.asc"]);
        assert!(fakes.remote.calls.borrow().is_empty());

        let output = fs::read(inv.output_path()).unwrap();
        assert!(output.ends_with(KEY));
        let preamble = &output[..output.len() - KEY.len()];
        assert!(String::from_utf8_lossy(preamble)
                .ends_with(&format!("{}\n", preamble::format_date(
                    &FixedClock::default().0))));
    }

    #[test]
    fn resumes_without_asking() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), Some("foo.asc"));
        fs::write(inv.pending_path(), "earlier preamble\n").unwrap();
        assert_eq!(RunState::detect(&inv), RunState::PreambleComplete);

        let fakes = Fakes::new();
        let mut script = Script::new(&[]);
        run(&inv, &fakes.services(), &mut script, &FixedClock::default())
            .unwrap();
        assert!(script.asked.is_empty());

        let mut expected = b"earlier preamble\n".to_vec();
        expected.extend_from_slice(KEY);
        assert_eq!(fs::read(inv.output_path()).unwrap(), expected);
        assert_eq!(names(tmp.path()), vec!["foo.asc", "foo.asc.sig.asc"]);
    }

    #[test]
    fn uploads_when_asked_to() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), None)
            .with_upload(Some("alice@example.org:www".parse().unwrap()));
        let fakes = Fakes::new();
        let mut script = Script::new(&["n", "n"]);
        let state = run(&inv, &fakes.services(), &mut script,
                        &FixedClock::default()).unwrap();
        assert_eq!(state, RunState::Published);

        let calls = fakes.remote.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![inv.output_path(), inv.signature_path()]);
    }

    #[test]
    fn failed_upload_keeps_local_files() {
        let tmp = TempDir::new().unwrap();
        let inv = Invocation::new("ABCD1234", tmp.path(), None)
            .with_upload(Some("example.org:www".parse().unwrap()));
        let mut fakes = Fakes::new();
        fakes.remote.fail = true;
        let mut script = Script::new(&["n", "n"]);
        assert!(run(&inv, &fakes.services(), &mut script,
                    &FixedClock::default()).is_err());
        assert_eq!(names(tmp.path()),
                   vec!["ABCD1234.asc", "ABCD1234.sig.asc"]);
    }

    #[test]
    fn output_clashing_with_temporary_files() {
        for o in &["ABCD1234.pub", "ABCD1234.prepend"] {
            let tmp = TempDir::new().unwrap();
            let inv = Invocation::new("ABCD1234", tmp.path(), Some(o));
            let fakes = Fakes::new();
            let mut script = Script::new(&["n", "n"]);
            let err = run(&inv, &fakes.services(), &mut script,
                          &FixedClock::default()).unwrap_err();
            assert!(matches!(err.downcast_ref::<crate::Error>(),
                             Some(crate::Error::OutputClash(_))));
            assert!(script.asked.is_empty());
            assert_eq!(*fakes.keys.exports.borrow(), 0);
            assert!(names(tmp.path()).is_empty());
        }
    }

    #[test]
    fn states_are_ordered() {
        assert!(RunState::NotStarted < RunState::PreambleComplete);
        assert!(RunState::Signed < RunState::Published);
    }
}
