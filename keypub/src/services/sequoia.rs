//! Key export and signing using Sequoia directly.
//!
//! The keys come from a keyring file instead of gpg's key database.
//! Signing needs the secret key material to be in that file.

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::fmt::Write as _;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::openpgp::{armor, Cert, Result};
use crate::openpgp::cert::prelude::*;
use crate::openpgp::crypto::Password;
use crate::openpgp::packet::prelude::*;
use crate::openpgp::parse::Parse;
use crate::openpgp::policy::StandardPolicy as P;
use crate::openpgp::serialize::Serialize;
use crate::openpgp::serialize::stream::{Armorer, Message, Signer};

use super::{KeyService, SigningService};
use crate::Error;

pub struct Keyring {
    path: PathBuf,
    certs: Vec<Cert>,
}

impl Keyring {
    /// Loads every cert in the file.
    pub fn open<F: AsRef<Path>>(path: F) -> Result<Self> {
        let path = path.as_ref();
        let mut certs = vec![];
        for maybe_cert in CertParser::from_file(path)
            .context(format!("Failed to load certs from file {:?}", path))?
        {
            certs.push(maybe_cert.context(
                format!("A cert from file {:?} is bad", path)
            )?);
        }
        log::info!("loaded {} cert(s) from {}", certs.len(), path.display());
        Ok(Keyring { path: path.into(), certs })
    }

    /// Returns the one cert `key_id` refers to.
    ///
    /// A hex string selects by (a suffix of) the fingerprint of the
    /// primary key or any subkey.  If that doesn't match, `key_id` is
    /// looked for in the User IDs, ignoring case.
    pub fn lookup(&self, key_id: &str) -> Result<&Cert> {
        let mut found: Vec<&Cert> = Vec::new();
        if let Some(hex) = normalize_hex(key_id) {
            found = self.certs.iter()
                .filter(|cert| cert.keys().any(|ka| {
                    ka.key().fingerprint().to_hex().ends_with(&hex)
                }))
                .collect();
        }

        if found.is_empty() {
            let needle = key_id.to_lowercase();
            found = self.certs.iter()
                .filter(|cert| cert.userids().any(|ua| {
                    String::from_utf8_lossy(ua.userid().value())
                        .to_lowercase()
                        .contains(&needle)
                }))
                .collect();
        }

        match found.len() {
            0 => Err(Error::KeyNotFound(key_id.into()).into()),
            1 => Ok(found[0]),
            _ => Err(Error::AmbiguousKey(key_id.into()).into()),
        }
    }
}

impl From<Vec<Cert>> for Keyring {
    fn from(certs: Vec<Cert>) -> Self {
        Keyring { path: PathBuf::new(), certs }
    }
}

/// Returns the key identifier as upper case hex, if it is one.
fn normalize_hex(key_id: &str) -> Option<String> {
    let id = key_id.trim();
    let id = id.strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id);
    let hex: String = id.chars().filter(|c| ! c.is_whitespace()).collect();
    if hex.len() >= 8 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hex.to_uppercase())
    } else {
        None
    }
}

/// Formats a fingerprint the way gpg does, `ABCD 1234 ...  ...`.
fn spaced(hex: &str) -> String {
    let groups: Vec<String> = hex.chars()
        .chunks(4).into_iter()
        .map(|c| c.collect())
        .collect();
    let half = groups.len() / 2;
    if groups.len() == 10 {
        format!("{}  {}", groups[..half].join(" "), groups[half..].join(" "))
    } else {
        groups.join(" ")
    }
}

fn date(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).format("%Y-%m-%d").to_string()
}

/// Renders the listing `gpg --fingerprint` would show.
fn listing(cert: &Cert) -> Result<String> {
    let mut s = String::new();
    let primary = cert.primary_key().key();
    writeln!(s, "pub   {} {}", primary.pk_algo(), date(primary.creation_time()))?;
    writeln!(s, "      Key fingerprint = {}", spaced(&primary.fingerprint().to_hex()))?;
    for ua in cert.userids() {
        writeln!(s, "uid                  {}", ua.userid())?;
    }
    for ka in cert.keys().subkeys() {
        let key = ka.key();
        writeln!(s, "sub   {} {}", key.pk_algo(), date(key.creation_time()))?;
    }
    Ok(s)
}

// Decrypts a key, if needed, by asking for its password.
fn unlock(key: Key<key::SecretParts, key::UnspecifiedRole>)
          -> Result<Key<key::SecretParts, key::UnspecifiedRole>>
{
    if let SecretKeyMaterial::Unencrypted(_) = key.secret() {
        return Ok(key);
    }

    let mut first = true;
    loop {
        let p = rpassword::read_password_from_tty(Some(&format!(
            "{}Enter password to unlock {} (blank to skip): ",
            if first { "" } else { "Invalid password. " },
            key.keyid().to_hex())))
            .context("While reading password")?;
        first = false;
        if p.is_empty() {
            break;
        }

        if let Ok(key) = key.clone().decrypt_secret(&Password::from(&p[..])) {
            return Ok(key);
        }
    }

    Err(anyhow::anyhow!("Key {}: Unable to decrypt secret key material",
                        key.keyid().to_hex()))
}

impl KeyService for Keyring {
    fn fingerprint_command(&self, key_id: &str) -> String {
        // The listing follows gpg's, so that is what a reader would
        // use to compare.
        format!("gpg --fingerprint {}", key_id)
    }

    fn fingerprint(&self, key_id: &str) -> Result<String> {
        listing(self.lookup(key_id)?)
    }

    fn export_public_key(&self, key_id: &str, dest: &Path) -> Result<()> {
        let cert = self.lookup(key_id)?;
        log::debug!("exporting {} from {}", cert.fingerprint(),
                    self.path.display());
        let mut sink = File::create(dest)
            .context(format!("Failed to create {:?}", dest))?;
        // Only the public parts are serialized.
        cert.armored().serialize(&mut sink)?;
        Ok(())
    }
}

impl SigningService for Keyring {
    fn detached_sign(&self, key_id: &str, input: &Path, output: &Path)
                     -> Result<()> {
        let cert = self.lookup(key_id)?;
        let policy = &P::new();
        let key = cert.keys().with_policy(policy, None)
            .alive().revoked(false).for_signing().supported()
            .secret()
            .map(|ka| ka.key().clone())
            .next()
            .ok_or_else(|| Error::NoSigningKey(cert.fingerprint().to_hex()))?;
        log::debug!("signing {} with {}", input.display(), key.fingerprint());
        let keypair = unlock(key)?.into_keypair()?;

        let mut data = File::open(input)
            .context(format!("Failed to open {:?}", input))?;
        let mut sink = File::create(output)
            .context(format!("Failed to create {:?}", output))?;

        let message = Message::new(&mut sink);
        let message = Armorer::new(message)
            .kind(armor::Kind::Signature)
            .build()?;
        let mut signer = Signer::new(message, keypair).detached().build()?;
        io::copy(&mut data, &mut signer)?;
        signer.finalize()?;
        Ok(())
    }
}
