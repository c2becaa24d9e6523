//! Cache-table generator
//!
//! Produces the flat file of precomputed zero-block records consumed by
//! `b3zsum`. The block count must divide into whole waves
//! (`threads * 32`); invalid configurations are rejected before anything
//! is written.

use anyhow::{Context, Result};
use b3zsum::generate_table;
use clap::{value_parser, Arg, Command};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let matches = Command::new("b3zgen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate the zero-block cache table for b3zsum")
        .arg(
            Arg::new("output")
                .value_name("FILE")
                .required(true)
                .help("Cache table output path"),
        )
        .arg(
            Arg::new("blocks")
                .value_name("COUNT")
                .required(true)
                .value_parser(value_parser!(u64))
                .help("Number of zero-block records to generate"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .help("Worker threads (default: all cores)"),
        )
        .get_matches();

    let output = matches.get_one::<String>("output").expect("required");
    let blocks = *matches.get_one::<u64>("blocks").expect("required");
    let threads = matches.get_one::<usize>("threads").copied().unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1)
    });

    log::info!("generating {blocks} records with {threads} threads");
    generate_table(output, blocks, threads)
        .with_context(|| format!("generating cache table {output}"))?;
    Ok(())
}
