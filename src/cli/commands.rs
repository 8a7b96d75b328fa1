//! # Command Implementations
//!
//! Thin wrappers around [`BTree`]: existence checks, decimal parsing, CSV
//! line handling. Malformed CSV lines during `load` are skipped with a
//! warning rather than aborting the bulk load; everything else fails the
//! whole command.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use eyre::{bail, eyre, Result, WrapErr};
use tracing::warn;

use crate::btree::BTree;

/// Parses a decimal signed 64-bit integer CLI operand.
pub fn parse_num(s: &str) -> Result<i64> {
    s.trim()
        .parse()
        .map_err(|_| eyre!("invalid number: '{}'", s))
}

fn require_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} {:?} does not exist", what, path);
    }
    Ok(())
}

/// `create <indexfile>`: fails if the file already exists.
pub fn create(index: &Path) -> Result<()> {
    if index.exists() {
        bail!("index file {:?} already exists", index);
    }

    let tree = BTree::create(index)?;
    tree.close()?;

    println!("Index file created: {}", index.display());
    Ok(())
}

/// `insert <indexfile> <key> <value>`
pub fn insert(index: &Path, key: &str, value: &str) -> Result<()> {
    let key = parse_num(key)?;
    let value = parse_num(value)?;
    require_exists(index, "index file")?;

    let mut tree = BTree::open(index)?;
    tree.insert(key, value)?;
    tree.close()?;

    println!("Inserted key={}, value={}", key, value);
    Ok(())
}

/// `search <indexfile> <key>`: a miss is reported on stdout, not as an
/// error.
pub fn search(index: &Path, key: &str) -> Result<()> {
    let key = parse_num(key)?;
    require_exists(index, "index file")?;

    let mut tree = BTree::open(index)?;
    match tree.search(key)? {
        Some(value) => println!("Found: {} -> {}", key, value),
        None => println!("Key {} not found.", key),
    }
    tree.close()
}

/// `load <indexfile> <csvfile>`: inserts every well-formed `key,value`
/// line; blank lines are ignored and malformed ones skipped with a
/// warning.
pub fn load(index: &Path, csv: &Path) -> Result<()> {
    require_exists(index, "index file")?;
    require_exists(csv, "CSV file")?;

    let reader = BufReader::new(
        File::open(csv).wrap_err_with(|| format!("failed to open CSV file {:?}", csv))?,
    );

    let mut tree = BTree::open(index)?;
    let mut loaded = 0usize;
    for line in reader.lines() {
        let line = line.wrap_err("failed to read CSV line")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_csv_line(line) {
            Some((key, value)) => {
                tree.insert(key, value)?;
                loaded += 1;
            }
            None => {
                warn!(line, "skipping malformed CSV line");
                eprintln!("Skipping invalid line: {}", line);
            }
        }
    }
    tree.close()?;

    println!(
        "Loaded {} entries from {} into {}",
        loaded,
        csv.display(),
        index.display()
    );
    Ok(())
}

fn parse_csv_line(line: &str) -> Option<(i64, i64)> {
    let mut fields = line.split(',');
    let key = fields.next()?.trim().parse().ok()?;
    let value = fields.next()?.trim().parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((key, value))
}

/// `print <indexfile>`: in-order dump, one `key,value` line per entry.
pub fn print(index: &Path) -> Result<()> {
    require_exists(index, "index file")?;

    let mut tree = BTree::open(index)?;
    let mut cursor = tree.cursor();
    while let Some((key, value)) = cursor.next_entry()? {
        println!("{},{}", key, value);
    }
    tree.close()
}

/// `extract <indexfile> <csvfile>`: same dump into a freshly created
/// file; refuses to overwrite.
pub fn extract(index: &Path, csv: &Path) -> Result<()> {
    require_exists(index, "index file")?;
    if csv.exists() {
        bail!("output file {:?} already exists", csv);
    }

    let mut out = BufWriter::new(
        File::create(csv).wrap_err_with(|| format!("failed to create CSV file {:?}", csv))?,
    );

    let mut tree = BTree::open(index)?;
    let mut cursor = tree.cursor();
    while let Some((key, value)) = cursor.next_entry()? {
        writeln!(out, "{},{}", key, value)?;
    }
    out.flush()?;
    tree.close()?;

    println!("Extracted index to CSV: {}", csv.display());
    Ok(())
}
