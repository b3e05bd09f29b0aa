//! Reads type names from stdin, one per line, and prints them as indented trees.
//!
//! Usage: `prettyprint [INDENT] [COLLAPSE_DEPTH]`. The indent defaults to 4 spaces; without a
//! collapse depth nothing is collapsed.

use std::{
    error::Error,
    io::{self, BufRead, Write},
};

use tenh::pretty::print_pretty_typestring;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let indent = match args.next() {
        Some(arg) => arg.parse()?,
        None => 4,
    };
    let collapse_depth = match args.next() {
        Some(arg) => arg.parse()?,
        None => usize::MAX,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in io::stdin().lock().lines() {
        let line = line?;
        writeln!(out, "{}", print_pretty_typestring(&line, indent, collapse_depth))?;
    }
    Ok(())
}
