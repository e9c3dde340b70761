//! Thin CLI shim: read a chunk file from argv, run it, map the result to a
//! process exit code. Everything interesting lives in the library.

use std::{env, fs, process};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let path = match env::args().nth(1) {
        Some(p) => p,
        None => {
            eprintln!("usage: chunk-vm-run <chunk-file>");
            process::exit(2);
        }
    };

    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to read {path}: {e}");
            process::exit(1);
        }
    };

    match chunk_vm::interpreter::load_and_run(&bytes) {
        Ok(_) => process::exit(0),
        Err(e) => {
            eprintln!("chunk-vm: {e}");
            process::exit(1);
        }
    }
}
