//! Prepares a signed, publishable copy of an OpenPGP public key.

use clap::{ArgMatches, ErrorKind};
use std::io;
use std::path::PathBuf;
use std::process;

use sequoia_openpgp as openpgp;
use openpgp::Result;

mod commands;
mod error;
mod invocation;
mod keypub_cli;
mod services;
#[cfg(test)]
mod testing;

pub use crate::error::Error;
use crate::commands::preamble::{SystemClock, Terminal};
use crate::commands::{RunState, Services};
use crate::invocation::{Destination, Invocation};
use crate::services::{KeyService, SigningService};
use crate::services::gnupg::GnuPG;
use crate::services::scp::Scp;
use crate::services::sequoia::Keyring;

fn print_error_chain(err: &anyhow::Error) {
    eprintln!("keypub: {}", err);
    err.chain().skip(1).for_each(|cause| eprintln!("  because: {}", cause));
}

fn main() {
    env_logger::init();

    let mut app = keypub_cli::build();
    let matches = match app.get_matches_from_safe_borrow(std::env::args_os()) {
        Ok(matches) => matches,
        Err(e) => match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => {
                println!("{}", e.message);
                process::exit(1);
            }
        },
    };

    let key_id = match matches.value_of("keyid") {
        Some(key_id) => key_id,
        None => {
            // Usage is all we can offer.
            let _ = app.print_help();
            println!();
            process::exit(1);
        }
    };

    if let Err(err) = real_main(&matches, key_id) {
        print_error_chain(&err);
        process::exit(error::exit_status(&err));
    }
}

fn real_main(m: &ArgMatches, key_id: &str) -> Result<()> {
    let upload = m.value_of("upload")
        .map(|u| u.parse::<Destination>())
        .transpose()?;
    let home = m.value_of("home")
        .map(PathBuf::from)
        .unwrap_or_else(invocation::default_home);

    let invocation = Invocation::new(key_id, home, m.value_of("output"))
        .with_otr_fingerprint(m.value_of("otr-fingerprint").map(Into::into))
        .with_upload(upload)
        .with_prompt(invocation::shell_prompt());
    invocation.check()?;
    log::info!("publishing {} from {}", invocation.key_id,
               invocation.home.display());

    let gpg: GnuPG;
    let keyring: Keyring;
    let (keys, signer): (&dyn KeyService, &dyn SigningService) =
        if let Some(path) = m.value_of("keyring") {
            keyring = Keyring::open(path)?;
            (&keyring, &keyring)
        } else {
            gpg = GnuPG::new(m.value_of_os("gpg").expect("has default"));
            (&gpg, &gpg)
        };
    let scp = Scp::new(m.value_of_os("scp").expect("has default"));

    let stdin = io::stdin();
    let mut prompter = Terminal::new(stdin.lock(), io::stdout());

    let state = commands::run(&invocation,
                              &Services { keys, signer, remote: &scp },
                              &mut prompter, &SystemClock)?;

    println!("Wrote {} and {}",
             invocation.output_path().display(),
             invocation.signature_path().display());
    if state == RunState::Published {
        if let Some(dest) = &invocation.upload {
            println!("Copied both to {}", dest);
        }
    }
    Ok(())
}
