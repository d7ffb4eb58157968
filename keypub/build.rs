use std::env;
use std::fs;
use clap::Shell;

mod keypub_cli {
    include!("src/keypub_cli.rs");
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src/keypub_cli.rs");

    let outdir = match env::var_os("CARGO_TARGET_DIR") {
        None => return,
        Some(outdir) => outdir,
    };
    fs::create_dir_all(&outdir).unwrap();
    let mut keypub = keypub_cli::build();
    for shell in &[Shell::Bash, Shell::Fish, Shell::Zsh, Shell::PowerShell,
                   Shell::Elvish] {
        keypub.gen_completions("keypub", *shell, &outdir);
    }
}
