// Copyright 2025 Lance Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark trigger commands posted as PR comments.
//!
//! ```text
//! @bench-bot benchmark [--all] [--rust-only | --python-only] [--crate <name>]...
//! ```
//!
//! Parsing is lenient: tokens outside the vocabulary are ignored so chatter
//! around a valid command does not block it. Quotes, brackets and trailing
//! punctuation around a flag or crate name are stripped before matching.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

/// Mention that addresses the bot.
pub const MENTION: &str = "@bench-bot";

const KEYWORD: &str = "benchmark";

static CRATE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid crate name regex"));

/// A parsed trigger command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchCommand {
    pub run: bool,
    pub rust_only: bool,
    pub python_only: bool,
    /// Explicit crate selection; empty means every Rust crate.
    pub crates: BTreeSet<String>,
}

impl Default for BenchCommand {
    fn default() -> Self {
        Self {
            run: true,
            rust_only: false,
            python_only: false,
            crates: BTreeSet::new(),
        }
    }
}

impl BenchCommand {
    /// Parse a comment body, or `None` if it is not addressed to the bot.
    pub fn parse(body: &str) -> Option<Self> {
        let lower = body.to_lowercase();
        if !lower.contains(MENTION) || !lower.contains(KEYWORD) {
            return None;
        }

        let mut command = Self::default();
        let mut tokens = body
            .split(|c: char| c.is_whitespace() || c == ',')
            .map(trim_token)
            .filter(|t| !t.is_empty())
            .peekable();
        while let Some(token) = tokens.next() {
            let flag = token.to_ascii_lowercase();
            match flag.as_str() {
                "--all" => {}
                "--rust-only" => command.rust_only = true,
                "--python-only" => command.python_only = true,
                "--crate" => {
                    if let Some(name) = tokens.next_if(|next| is_crate_name(next)) {
                        command.crates.insert(name.to_string());
                    }
                }
                _ => {
                    if let Some(name) = flag.strip_prefix("--crate=") {
                        let name = &token[token.len() - name.len()..];
                        if is_crate_name(name) {
                            command.crates.insert(name.to_string());
                        }
                    }
                }
            }
        }
        Some(command)
    }

    pub fn runs_rust(&self) -> bool {
        !self.python_only
    }

    /// Python benchmarks are skipped when specific crates were requested.
    pub fn runs_python(&self) -> bool {
        !self.rust_only && self.crates.is_empty()
    }

    pub fn is_runnable(&self) -> bool {
        self.run && (self.runs_rust() || self.runs_python())
    }

    /// Human-readable description of what will run.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.runs_rust() {
            if self.crates.is_empty() {
                parts.push("All Rust benchmarks".to_string());
            } else {
                let crates: Vec<&str> = self.crates.iter().map(String::as_str).collect();
                parts.push(format!("Rust crates: {}", crates.join(", ")));
            }
        }
        if self.runs_python() {
            parts.push("Python benchmarks".to_string());
        }
        if parts.is_empty() {
            "No benchmarks (invalid config)".to_string()
        } else {
            parts.join(" + ")
        }
    }
}

/// Strip markdown and prose punctuation such as `` ` ``, `(` or a trailing `.`.
fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
}

fn is_crate_name(token: &str) -> bool {
    !token.starts_with("--") && CRATE_NAME.is_match(token)
}
