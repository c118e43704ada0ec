//! Transaction Trace Loader.
//!
//! Reads transaction traces from disk. Each non-empty line describes one
//! transaction:
//!
//! ```text
//! <addr> <R|W> [length] [start]
//! ```
//!
//! `addr` is hexadecimal with a `0x` prefix or decimal. `length` defaults to
//! one granule and `start` to cycle 0. Everything after `#` is a comment.

use std::fs;
use std::path::Path;

use crate::common::{RequestType, SimError, SimResult};
use crate::sim::request::{Transaction, TransactionIds};

/// Loads a trace file, assigning ids from `ids` in file order.
pub fn load_trace(path: &Path, granule: u64, ids: &mut TransactionIds) -> SimResult<Vec<Transaction>> {
    let content = fs::read_to_string(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let transactions = parse_trace(&content, granule, ids)?;
    log::info!("loaded {} transactions from {}", transactions.len(), path.display());
    Ok(transactions)
}

/// Parses trace text, assigning ids from `ids` in line order.
pub fn parse_trace(content: &str, granule: u64, ids: &mut TransactionIds) -> SimResult<Vec<Transaction>> {
    let mut transactions = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let err = |detail: String| SimError::TraceParse { line, detail };
        let mut tokens = text.split_whitespace();

        let addr_tok = tokens.next().ok_or_else(|| err("missing address".to_string()))?;
        let addr = parse_number(addr_tok).ok_or_else(|| err(format!("bad address '{}'", addr_tok)))?;

        let kind = match tokens.next() {
            Some("R") | Some("r") => RequestType::Read,
            Some("W") | Some("w") => RequestType::Write,
            Some(other) => return Err(err(format!("bad request type '{}'", other))),
            None => return Err(err("missing request type".to_string())),
        };

        let len = match tokens.next() {
            Some(tok) => parse_number(tok).ok_or_else(|| err(format!("bad length '{}'", tok)))?,
            None => granule,
        };

        let start = match tokens.next() {
            Some(tok) => parse_number(tok).ok_or_else(|| err(format!("bad start cycle '{}'", tok)))?,
            None => 0,
        };

        if let Some(extra) = tokens.next() {
            return Err(err(format!("unexpected token '{}'", extra)));
        }

        transactions.push(ids.transaction(start, kind, addr, len));
    }

    Ok(transactions)
}

fn parse_number(tok: &str) -> Option<u64> {
    match tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => tok.parse().ok(),
    }
}
