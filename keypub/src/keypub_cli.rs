/// Command-line parser for keypub.

use clap::{App, Arg};

pub fn build() -> App<'static, 'static> {
    configure(App::new("keypub"))
}

/// Defines the CLI.
///
/// The options mirror the three knobs of a run (upload destination,
/// output file, OTR fingerprint), followed by the backend selection.
pub fn configure(app: App<'static, 'static>) -> App<'static, 'static> {
    app
        .version(env!("CARGO_PKG_VERSION"))
        .about("Prepares a signed, publishable copy of an OpenPGP \
                public key.  The exported key is prefixed with its \
                fingerprint, an optional OTR fingerprint, and a \
                timestamp, and a detached signature is created over \
                the result.")
        .arg(Arg::with_name("upload")
             .short("u").long("upload").value_name("USER@HOST:DIR")
             .help("Copies the key and its signature to this location \
                    using scp"))
        .arg(Arg::with_name("output")
             .short("o").long("output").value_name("FILE")
             .help("Sets the output file to use \
                    [default: KEYID.asc]"))
        .arg(Arg::with_name("otr-fingerprint")
             .short("f").long("otr-fingerprint").value_name("FINGERPRINT")
             .help("Includes this OTR fingerprint without asking"))
        .arg(Arg::with_name("home")
             .long("home").value_name("DIRECTORY")
             .help("Sets the directory files are created in \
                    [default: your home directory]"))
        .arg(Arg::with_name("keyring")
             .long("keyring").value_name("FILE")
             .help("Uses the certificates in FILE instead of gpg \
                    (takes precedence over --gpg).  The key must \
                    include its secret key material to create the \
                    signature"))
        .arg(Arg::with_name("gpg")
             .long("gpg").value_name("PROGRAM")
             .default_value("gpg")
             .help("Sets the gpg program to use"))
        .arg(Arg::with_name("scp")
             .long("scp").value_name("PROGRAM")
             .default_value("scp")
             .help("Sets the scp program to use"))
        .arg(Arg::with_name("keyid")
             .value_name("KEYID")
             .help("The key to publish, given as a fingerprint, key ID, \
                    or User ID"))
}
