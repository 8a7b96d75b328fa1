//! # CLI Module
//!
//! One-shot subcommands over an index file, one function per command:
//!
//! | Command                              | Description                          |
//! |--------------------------------------|--------------------------------------|
//! | `create <indexfile>`                 | Create a new, empty index            |
//! | `insert <indexfile> <key> <value>`   | Insert one pair                      |
//! | `search <indexfile> <key>`           | Point lookup                         |
//! | `load <indexfile> <csvfile>`         | Bulk-insert `key,value` lines        |
//! | `print <indexfile>`                  | In-order dump to stdout              |
//! | `extract <indexfile> <csvfile>`      | In-order dump to a new CSV file      |
//!
//! Every command maps failure to a one-line stderr message and exit code 1
//! (wired up in the binary); a search miss is a normal outcome and exits 0.
//!
//! The command layer contains no tree logic: it checks file existence,
//! parses numbers, and loops over the core's `insert` and cursor
//! primitives.

pub mod commands;
