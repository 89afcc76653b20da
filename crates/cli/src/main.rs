//! Offline tooling for canned responses directories.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use canned_core::{QueryKey, ResponsesDir, StorageName, normalize};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "canned-index", version, about = "Inspect canned responses directories")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
enum Command {
    /// Print the normalized form of a query string.
    Normalize { query: String },
    /// Print the storage file name for a query string.
    Name {
        query: String,
        /// Hash the query verbatim instead of normalizing it first.
        #[arg(long)]
        raw: bool,
    },
    /// List index entries as `key<TAB>file`.
    List { directory: PathBuf },
    /// Check that every index entry has a body file and report unreferenced files.
    Verify { directory: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Normalized(String),
    Named(StorageName),
    Listed(Vec<(QueryKey, StorageName)>),
    Verified { entries: usize, missing: Vec<(QueryKey, StorageName)>, orphaned: Vec<StorageName> },
}

impl Outcome {
    fn is_success(&self) -> bool {
        !matches!(self, Outcome::Verified { missing, .. } if !missing.is_empty())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        match self {
            Outcome::Normalized(key) => out.push_str(key),
            Outcome::Named(name) => out.push_str(name.as_str()),
            Outcome::Listed(entries) => {
                for (key, name) in entries {
                    let _ = writeln!(out, "{key}\t{name}");
                }
            }
            Outcome::Verified { entries, missing, orphaned } => {
                for (key, name) in missing {
                    let _ = writeln!(out, "missing\t{key}\t{name}");
                }
                for name in orphaned {
                    let _ = writeln!(out, "orphaned\t{name}");
                }
                let _ = write!(
                    out,
                    "{entries} entries, {} missing, {} orphaned",
                    missing.len(),
                    orphaned.len()
                );
            }
        }
        out
    }
}

async fn execute(command: Command) -> anyhow::Result<Outcome> {
    match command {
        Command::Normalize { query } => Ok(Outcome::Normalized(normalize(&query))),
        Command::Name { query, raw } => {
            let key = if raw { QueryKey::raw(&query) } else { QueryKey::normalized(&query) };
            Ok(Outcome::Named(StorageName::for_key(&key)))
        }
        Command::List { directory } => {
            let responses = ResponsesDir::new(directory);
            let index = load_index(&responses).await?;
            Ok(Outcome::Listed(index.iter().map(|(k, n)| (k.clone(), n.clone())).collect()))
        }
        Command::Verify { directory } => {
            let responses = ResponsesDir::new(directory);
            let index = load_index(&responses).await?;

            let mut missing = Vec::new();
            for (key, name) in index.iter() {
                if !responses.store().contains(name).await {
                    missing.push((key.clone(), name.clone()));
                }
            }

            let referenced: BTreeSet<&StorageName> = index.iter().map(|(_, name)| name).collect();
            let orphaned = responses
                .store()
                .stored_names()
                .await?
                .into_iter()
                .filter(|name| !referenced.contains(name))
                .collect();

            Ok(Outcome::Verified { entries: index.len(), missing, orphaned })
        }
    }
}

async fn load_index(responses: &ResponsesDir) -> anyhow::Result<canned_core::Index> {
    responses
        .load_index()
        .await
        .with_context(|| format!("load index from {}", responses.root().display()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli.command).await {
        Ok(outcome) => {
            println!("{}", outcome.render());
            if outcome.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Err(err) => {
            eprintln!("canned-index: {err:#}");
            ExitCode::from(2)
        }
    }
}
