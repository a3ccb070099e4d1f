pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Fetch, cache and inspect PDF documents", long_about = None)]
pub struct Cli {
    /// Cache database to use instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Bypass the persistent cache entirely
    #[arg(long, global = true, conflicts_with = "db")]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a document through the cache
    Load {
        /// URL of the document
        url: String,

        /// Write the bytes to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Inspect or maintain the document cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached documents, least recently read first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one document
    Remove {
        /// URL of the document to remove
        url: String,
    },
    /// Remove every document
    Clear,
    /// Evict until the configured limits hold
    Trim,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_load_with_output() {
        let cli = Cli::parse_from(["folio", "load", "https://example.com/a.pdf", "--out", "a.pdf"]);
        match cli.command {
            Commands::Load { url, out } => {
                assert_eq!(url, "https://example.com/a.pdf");
                assert_eq!(out, Some(PathBuf::from("a.pdf")));
            }
            _ => panic!("expected load"),
        }
        assert!(!cli.no_cache);
    }

    #[test]
    fn test_parse_cache_list_json_with_db() {
        let cli = Cli::parse_from(["folio", "cache", "list", "--json", "--db", "/tmp/c.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/c.db")));
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::List { json: true }
            }
        ));
    }

    #[test]
    fn test_db_conflicts_with_no_cache() {
        let parsed = Cli::try_parse_from(["folio", "--no-cache", "--db", "x.db", "cache", "clear"]);
        assert!(parsed.is_err());
    }
}
