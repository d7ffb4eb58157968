//! The immutable context of one run.
//!
//! Every stage receives the [`Invocation`] instead of consulting the
//! environment or the current directory: all files are resolved
//! against [`Invocation::home`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::Error;

/// Where the finished files are copied to, in scp's
/// `USER@HOST:DIR` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination(String);

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.find(':') {
            Some(i) if i > 0 => Ok(Destination(s.into())),
            _ => Err(Error::InvalidDestination(s.into())),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Destination {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    /// The key to publish, exactly as given on the command line.
    pub key_id: String,
    /// The directory relative paths are resolved against.
    pub home: PathBuf,
    output: PathBuf,
    signature: PathBuf,
    /// An OTR fingerprint given up front.
    pub otr_fingerprint: Option<String>,
    pub upload: Option<Destination>,
    /// The simulated shell prompt, e.g. `alice@host:~$`.
    pub prompt: String,
}

impl Invocation {
    /// Creates the context, deriving the file names.
    ///
    /// Without an explicit output file, the output is `KEYID.asc` and
    /// the signature `KEYID.sig.asc`.  Otherwise the signature is the
    /// output file name with `.sig.asc` appended.
    pub fn new<H>(key_id: &str, home: H, output: Option<&str>) -> Self
        where H: Into<PathBuf>
    {
        let (output, signature) = match output {
            Some(o) => (PathBuf::from(o), PathBuf::from(format!("{}.sig.asc", o))),
            None => (PathBuf::from(format!("{}.asc", key_id)),
                     PathBuf::from(format!("{}.sig.asc", key_id))),
        };

        Invocation {
            key_id: key_id.into(),
            home: home.into(),
            output,
            signature,
            otr_fingerprint: None,
            upload: None,
            prompt: "user@localhost:~$".into(),
        }
    }

    pub fn with_otr_fingerprint(mut self, fpr: Option<String>) -> Self {
        self.otr_fingerprint = fpr;
        self
    }

    pub fn with_upload(mut self, upload: Option<Destination>) -> Self {
        self.upload = upload;
        self
    }

    pub fn with_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Checks that the output and signature files are distinct from
    /// the pending preamble and the exported key.
    pub fn check(&self) -> Result<(), Error> {
        let temporary = [self.pending_path(), self.export_path()];
        for path in &[self.output_path(), self.signature_path()] {
            if temporary.contains(path) {
                return Err(Error::OutputClash(path.clone()));
            }
        }
        Ok(())
    }

    fn resolve<P: AsRef<Path>>(&self, p: P) -> PathBuf {
        self.home.join(p)
    }

    /// `KEYID.prepend`, the pending preamble.
    pub fn pending_path(&self) -> PathBuf {
        self.resolve(format!("{}.prepend", self.key_id))
    }

    /// `KEYID.pub`, the temporary exported key.
    pub fn export_path(&self) -> PathBuf {
        self.resolve(format!("{}.pub", self.key_id))
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.output)
    }

    pub fn signature_path(&self) -> PathBuf {
        self.resolve(&self.signature)
    }

    /// The output file as the user named it.
    pub fn output_name(&self) -> String {
        self.output.display().to_string()
    }

    /// The bare file name of the signature, as it appears in a URL.
    pub fn signature_file_name(&self) -> String {
        self.signature.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.signature.display().to_string())
    }
}

/// Computes `USER@HOST:~$` from the environment.
pub fn shell_prompt() -> String {
    let host = whoami::fallible::hostname()
        .unwrap_or_else(|_| "localhost".into());
    format!("{}@{}:~$", whoami::username(), host)
}

/// The user's home directory, or the current directory if there is
/// none.
pub fn default_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| ".".into())
}
