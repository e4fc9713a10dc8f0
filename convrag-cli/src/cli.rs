use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Index a document per conversation and ask questions about it.
#[derive(Parser, Debug)]
#[command(name = "convrag", version, about, long_about = None)]
pub struct Cli {
    /// Log output format (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a document and answer questions about it
    Ask(SessionArgs),
    /// Ingest a document and print the retrieved contexts only
    Retrieve(SessionArgs),
    /// Drop a conversation's index from a Qdrant store
    #[cfg(feature = "qdrant")]
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// TOML pipeline configuration (defaults apply when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Conversation id used as the index namespace
    #[arg(long)]
    pub conversation: i64,

    /// Text or markdown document to ingest
    #[arg(short, long)]
    pub file: PathBuf,

    /// Question to ask; repeatable. Starts an interactive prompt when omitted
    #[arg(short, long = "query")]
    pub queries: Vec<String>,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[cfg(feature = "qdrant")]
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Conversation id whose index is dropped
    #[arg(long)]
    pub conversation: i64,

    /// Qdrant gRPC endpoint holding the index
    #[arg(long)]
    pub qdrant_url: String,
}

#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Qdrant gRPC endpoint; the in-memory store is used when omitted
    #[cfg(feature = "qdrant")]
    #[arg(long)]
    pub qdrant_url: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_queries() {
        let cli = Cli::parse_from([
            "convrag", "ask", "--conversation", "7", "--file", "doc.md", "-q", "one", "-q", "two",
        ]);
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.conversation, 7);
                assert_eq!(args.queries, vec!["one", "two"]);
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::parse_from([
            "convrag", "retrieve", "--conversation", "3", "--file", "doc.md", "--log-format",
            "json",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[cfg(not(feature = "qdrant"))]
    #[test]
    fn remove_needs_the_qdrant_feature() {
        let result = Cli::try_parse_from(["convrag", "remove", "--conversation", "3"]);
        assert!(result.is_err());
    }

    #[cfg(feature = "qdrant")]
    #[test]
    fn remove_requires_a_qdrant_url() {
        let result = Cli::try_parse_from(["convrag", "remove", "--conversation", "3"]);
        assert!(result.is_err());

        let cli = Cli::parse_from([
            "convrag", "remove", "--conversation", "3", "--qdrant-url", "http://localhost:6334",
        ]);
        match cli.command {
            Commands::Remove(args) => {
                assert_eq!(args.conversation, 3);
                assert_eq!(args.qdrant_url, "http://localhost:6334");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
