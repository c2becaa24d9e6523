//! Sparse-aware BLAKE3 checksum tool
//!
//! Prints `<hex digest>  <path>` per file, like the classic *sum tools.
//! The zero-block cache table is opened once before any hashing; if it is
//! missing the digests are still correct, just slower on sparse files.

use anyhow::Result;
use b3zsum::{hash_file, CacheTable};
use clap::{Arg, Command};
use std::path::{Path, PathBuf};

/// Expands to the directory containing the running executable, so an
/// installed binary finds the table shipped next to it.
const EXE_PLACEHOLDER: &str = "{exe_path}";

const DEFAULT_CACHE: &str = "{exe_path}/b3z.cache";

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let matches = Command::new("b3zsum")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sparse-aware BLAKE3 file checksums")
        .arg(
            Arg::new("cache")
                .short('c')
                .long("cache")
                .value_name("FILE")
                .default_value(DEFAULT_CACHE)
                .help("Zero-block cache table ({exe_path} expands to the executable's directory)"),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .required(true)
                .num_args(1..)
                .help("Files to hash"),
        )
        .get_matches();

    let cache_path = expand_exe_path(matches.get_one::<String>("cache").expect("has default"));
    let cache = CacheTable::open(&cache_path);

    let mut failures = 0usize;
    for name in matches.get_many::<String>("files").expect("required") {
        match hash_file(name, &cache) {
            Ok(hash) => println!("{}  {}", hash.to_hex(), name),
            Err(err) => {
                eprintln!("b3zsum: {err}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn expand_exe_path(raw: &str) -> PathBuf {
    if !raw.contains(EXE_PLACEHOLDER) {
        return PathBuf::from(raw);
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    PathBuf::from(raw.replace(EXE_PLACEHOLDER, &exe_dir.to_string_lossy()))
}
