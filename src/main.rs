use clap::{Parser, Subcommand};
use shikkha_qa::Result;
use shikkha_qa::commands::{list_books, run_ask, run_ingest, show_status};
use shikkha_qa::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "shikkha-qa")]
#[command(about = "Textbook question answering for Bangla study materials")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding and generation services
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build chunk stores from the books directory
    Ingest {
        /// Process a single book id instead of the whole catalog
        #[arg(long)]
        book: Option<String>,
    },
    /// Ask a question against the textbook catalog
    Ask {
        /// The question, in Bangla or English
        question: String,
        /// Pin the answer to a specific book id
        #[arg(long)]
        book: Option<String>,
    },
    /// List the supported textbooks and their store status
    List,
    /// Show service and store health
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { book } => {
            run_ingest(book)?;
        }
        Commands::Ask { question, book } => {
            run_ask(&question, book)?;
        }
        Commands::List => {
            list_books()?;
        }
        Commands::Status => {
            show_status()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["shikkha-qa", "list"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::List);
        }
    }

    #[test]
    fn ask_command_with_question() {
        let cli = Cli::try_parse_from(["shikkha-qa", "ask", "বল কাকে বলে?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question, book } = parsed.command {
                assert_eq!(question, "বল কাকে বলে?");
                assert_eq!(book, None);
            }
        }
    }

    #[test]
    fn ask_command_with_book_pin() {
        let cli = Cli::try_parse_from([
            "shikkha-qa",
            "ask",
            "explain tense",
            "--book",
            "english-grammar-9-10",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question, book } = parsed.command {
                assert_eq!(question, "explain tense");
                assert_eq!(book.as_deref(), Some("english-grammar-9-10"));
            }
        }
    }

    #[test]
    fn ingest_command_with_book_filter() {
        let cli = Cli::try_parse_from(["shikkha-qa", "ingest", "--book", "physics-9-10"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { book } = parsed.command {
                assert_eq!(book.as_deref(), Some("physics-9-10"));
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["shikkha-qa", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["shikkha-qa", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }
}
