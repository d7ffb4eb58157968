//! Builds the text that precedes the exported key.
//!
//! [`build`] only talks to the user through a [`Prompter`] and to the
//! key database through a [`KeyService`], and returns the blocks in
//! memory.  [`write_pending`] stores them as the pending preamble.

use anyhow::Context as _;
use chrono::{DateTime, Local};
use std::io::{self, BufRead, Write};

use sequoia_openpgp::Result;
use tempfile::NamedTempFile;

use crate::invocation::Invocation;
use crate::services::KeyService;

/// Where keypub can be obtained.
pub const HOMEPAGE: &str = env!("CARGO_PKG_REPOSITORY");

/// Answers that decline a `(Y/n)` question.  Anything else accepts.
pub const DECLINE: &[&str] = &["n", "N", "no", "No"];

pub const ASK_OTR: &str = "Include an OTR fingerprint? (Y/n) ";
pub const ASK_OTR_FINGERPRINT: &str = "OTR fingerprint: ";
pub const ASK_OTR_ACCOUNT: &str =
    "OTR account the fingerprint belongs to (e.g. you@jabber.example.org): ";
pub const ASK_LOCATION: &str = "Include an online location for this key? (Y/n) ";
pub const ASK_URL: &str =
    "Base URL the key will be published under (e.g. https://example.org/): ";

/// Asks the user questions.
pub trait Prompter {
    /// Shows `question` and returns the answer without surrounding
    /// whitespace.  An empty answer is a valid answer.
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Prompts on a terminal, or anything line based.
pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Terminal { input, output }
    }
}

impl<R: BufRead, W: Write> Prompter for Terminal<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        // At EOF, this is the empty answer.
        self.input.read_line(&mut line)
            .context("Failed to read answer")?;
        Ok(line.trim().to_string())
    }
}

/// Returns whether the answer to a `(Y/n)` question is no.
pub fn declined(answer: &str) -> bool {
    DECLINE.contains(&answer)
}

pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// The key's fingerprint listing.
    Fingerprint,
    /// The OTR account and fingerprint.
    Identity,
    /// Where keypub and the signature are found.
    Location,
    /// The signing statement and the time it was written.
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

/// The preamble, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preamble {
    blocks: Vec<Block>,
}

impl Preamble {
    fn push(&mut self, kind: BlockKind, text: String) {
        self.blocks.push(Block { kind, text });
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Concatenates the blocks.
    pub fn render(&self) -> String {
        self.blocks.iter().map(|b| b.text.as_str()).collect()
    }
}

/// Builds the preamble, asking the user for the optional parts.
pub fn build(invocation: &Invocation, keys: &dyn KeyService,
             prompter: &mut dyn Prompter, clock: &dyn Clock)
             -> Result<Preamble>
{
    let mut preamble = Preamble::default();

    preamble.push(BlockKind::Fingerprint, fingerprint_block(invocation, keys)?);
    if let Some(text) = identity_block(invocation, prompter)? {
        preamble.push(BlockKind::Identity, text);
    }
    preamble.push(BlockKind::Location, location_block(invocation, prompter)?);
    preamble.push(BlockKind::Timestamp, timestamp_block(invocation, clock));

    Ok(preamble)
}

fn fingerprint_block(invocation: &Invocation, keys: &dyn KeyService)
                     -> Result<String>
{
    let listing = keys.fingerprint(&invocation.key_id)
        .context("Failed to get the key's fingerprint")?;
    let mut text = format!("\n{} {}\n{}",
                           invocation.prompt,
                           keys.fingerprint_command(&invocation.key_id),
                           listing);
    if ! text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&format!("{} cat {}\n",
                           invocation.prompt, invocation.output_name()));
    Ok(text)
}

fn identity_block(invocation: &Invocation, prompter: &mut dyn Prompter)
                  -> Result<Option<String>>
{
    let fingerprint = match &invocation.otr_fingerprint {
        Some(fpr) => fpr.clone(),
        None => {
            if declined(&prompter.ask(ASK_OTR)?) {
                return Ok(None);
            }
            prompter.ask(ASK_OTR_FINGERPRINT)?
        }
    };
    if fingerprint.is_empty() {
        return Ok(None);
    }

    let account = prompter.ask(ASK_OTR_ACCOUNT)?;
    Ok(Some(format!("\nOTR fingerprint for {}:\n{}\n", account, fingerprint)))
}

fn location_block(invocation: &Invocation, prompter: &mut dyn Prompter)
                  -> Result<String>
{
    let mut text = format!("\nThis file was prepared with keypub, available from\n\
                            {}\n", HOMEPAGE);
    let signature = invocation.signature_file_name();

    let url = if declined(&prompter.ask(ASK_LOCATION)?) {
        String::new()
    } else {
        prompter.ask(ASK_URL)?
    };

    if url.is_empty() {
        text.push_str(&format!("The signature of this file is in {}\n",
                               signature));
    } else {
        text.push_str(&format!("The signature of this file can be found at\n\
                                {}{}\n", url, signature));
    }
    Ok(text)
}

fn timestamp_block(invocation: &Invocation, clock: &dyn Clock) -> String {
    format!("\nThis file is signed with the private key belonging to the \
             fingerprint\nabove.  Compare the signature's creation time \
             with this one:\n{} date\n{}\n",
            invocation.prompt, format_date(&clock.now()))
}

/// Formats the time in date(1)'s layout, with a numeric UTC offset
/// where date(1) prints the zone name.
pub fn format_date(t: &DateTime<Local>) -> String {
    t.format("%a %b %e %H:%M:%S %Z %Y").to_string()
}

/// Stores the preamble as the pending preamble.
///
/// The file appears atomically, so its existence means it is
/// complete.
pub fn write_pending(invocation: &Invocation, preamble: &Preamble)
                     -> Result<()>
{
    let path = invocation.pending_path();
    let mut tmp = NamedTempFile::new_in(&invocation.home)
        .context("Failed to create temporary file")?;
    tmp.write_all(preamble.render().as_bytes())?;
    tmp.flush()?;
    tmp.persist(&path)
        .map_err(io::Error::from)
        .context(format!("Failed to write {:?}", path))?;
    log::info!("wrote pending preamble {} ({} blocks)",
               path.display(), preamble.blocks().len());
    Ok(())
}
