//! # ordex CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! ordex create index.ord
//! ordex insert index.ord 42 7
//! ordex search index.ord 42
//! ordex load index.ord pairs.csv
//! ordex print index.ord
//! ordex extract index.ord dump.csv
//! ```
//!
//! Exit code 0 on success, 1 on any error (bad usage, missing file,
//! malformed number, invalid index file, I/O failure). A search miss is
//! not an error.

use std::env;
use std::path::Path;

use eyre::{bail, Result};
use ordex::cli::commands;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        bail!("no command provided");
    }

    let command = args[1].to_lowercase();
    let operands = &args[2..];

    match command.as_str() {
        "create" => {
            let [index] = expect_operands::<1>(&command, "<indexfile>", operands)?;
            commands::create(Path::new(index))
        }
        "insert" => {
            let [index, key, value] =
                expect_operands::<3>(&command, "<indexfile> <key> <value>", operands)?;
            commands::insert(Path::new(index), key, value)
        }
        "search" => {
            let [index, key] = expect_operands::<2>(&command, "<indexfile> <key>", operands)?;
            commands::search(Path::new(index), key)
        }
        "load" => {
            let [index, csv] = expect_operands::<2>(&command, "<indexfile> <csvfile>", operands)?;
            commands::load(Path::new(index), Path::new(csv))
        }
        "print" => {
            let [index] = expect_operands::<1>(&command, "<indexfile>", operands)?;
            commands::print(Path::new(index))
        }
        "extract" => {
            let [index, csv] = expect_operands::<2>(&command, "<indexfile> <csvfile>", operands)?;
            commands::extract(Path::new(index), Path::new(csv))
        }
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-v" => {
            println!("ordex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command '{}'", other);
        }
    }
}

fn expect_operands<'a, const N: usize>(
    command: &str,
    shape: &str,
    operands: &'a [String],
) -> Result<[&'a str; N]> {
    if operands.len() != N {
        bail!("usage: ordex {} {}", command, shape);
    }
    let mut out = [""; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = operand.as_str();
    }
    Ok(out)
}

fn print_usage() {
    println!("ordex - single-file ordered index");
    println!();
    println!("USAGE:");
    println!("    ordex <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    create  <indexfile>                Create a new index file");
    println!("    insert  <indexfile> <key> <value>  Insert one key/value pair");
    println!("    search  <indexfile> <key>          Look up a key");
    println!("    load    <indexfile> <csvfile>      Bulk-insert key,value lines");
    println!("    print   <indexfile>                Dump all pairs in key order");
    println!("    extract <indexfile> <csvfile>      Dump all pairs to a new CSV file");
    println!();
    println!("Keys and values are signed 64-bit decimal integers.");
    println!("Set RUST_LOG=debug for internal tracing.");
}
