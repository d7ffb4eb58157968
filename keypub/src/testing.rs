//! Stand-ins for the user and the collaborators.

use chrono::{DateTime, Local, TimeZone};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use sequoia_openpgp::Result;

use crate::commands::preamble::{Clock, Prompter};
use crate::invocation::Destination;
use crate::services::{KeyService, RemoteCopy, SigningService};
use crate::Error;

pub const FINGERPRINT: &str = "\
pub   ed25519 2026-10-16 [SC]
      Key fingerprint = 0123 4567 89AB CDEF 0123  4567 89AB CDEF ABCD 1234
uid           [ultimate] Alice <alice@example.org>
";

pub const KEY: &[u8] = b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n\
                         \n\
                         xjMEY0yoNBYJKwYBBAHaRw8BAQdA\n\
                         -----END PGP PUBLIC KEY BLOCK-----\n";

/// Answers questions from a list, and remembers them.
///
/// Running out of answers is an error.
pub struct Script {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
    /// Number of questions answered so far, shared with
    /// [`RecordingClock`].
    pub answered: Rc<Cell<usize>>,
}

impl Script {
    pub fn new(answers: &[&str]) -> Self {
        Script {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
            answered: Rc::new(Cell::new(0)),
        }
    }
}

impl Prompter for Script {
    fn ask(&mut self, question: &str) -> Result<String> {
        self.asked.push(question.into());
        let answer = self.answers.pop_front()
            .ok_or_else(|| anyhow::anyhow!("Unexpected question {:?}", question))?;
        self.answered.set(self.answered.get() + 1);
        Ok(answer)
    }
}

pub struct FixedClock(pub DateTime<Local>);

impl Default for FixedClock {
    fn default() -> Self {
        FixedClock(Local.timestamp_opt(1_792_000_000, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Notes how many questions a [`Script`] had answered whenever the
/// time is read.
pub struct RecordingClock {
    answered: Rc<Cell<usize>>,
    pub reads: RefCell<Vec<usize>>,
    time: DateTime<Local>,
}

impl RecordingClock {
    pub fn new(script: &Script) -> Self {
        RecordingClock {
            answered: script.answered.clone(),
            reads: RefCell::new(Vec::new()),
            time: FixedClock::default().0,
        }
    }
}

impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Local> {
        self.reads.borrow_mut().push(self.answered.get());
        self.time
    }
}

/// A key database with one key.
pub struct FakeKeys {
    pub key: Vec<u8>,
    pub exports: RefCell<usize>,
}

impl Default for FakeKeys {
    fn default() -> Self {
        FakeKeys { key: KEY.to_vec(), exports: RefCell::new(0) }
    }
}

impl KeyService for FakeKeys {
    fn fingerprint_command(&self, key_id: &str) -> String {
        format!("gpg --fingerprint {}", key_id)
    }

    fn fingerprint(&self, _: &str) -> Result<String> {
        Ok(FINGERPRINT.into())
    }

    fn export_public_key(&self, _: &str, dest: &Path) -> Result<()> {
        *self.exports.borrow_mut() += 1;
        fs::write(dest, &self.key)?;
        Ok(())
    }
}

/// "Signs" by writing the signed file's length.
#[derive(Default)]
pub struct FakeSigner {
    pub calls: RefCell<Vec<(String, PathBuf, PathBuf)>>,
}

impl SigningService for FakeSigner {
    fn detached_sign(&self, key_id: &str, input: &Path, output: &Path)
                     -> Result<()> {
        self.calls.borrow_mut().push((key_id.into(), input.into(), output.into()));
        let len = fs::metadata(input)?.len();
        fs::write(output, format!("-----BEGIN PGP SIGNATURE-----\n{}\n", len))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRemote {
    pub calls: RefCell<Vec<(Vec<PathBuf>, String)>>,
    pub fail: bool,
}

impl RemoteCopy for FakeRemote {
    fn copy(&self, files: &[&Path], dest: &Destination) -> Result<()> {
        self.calls.borrow_mut().push(
            (files.iter().map(|f| f.to_path_buf()).collect(), dest.to_string()));
        if self.fail {
            Err(Error::ToolFailed { tool: "scp".into(), status: Some(1) }.into())
        } else {
            Ok(())
        }
    }
}
