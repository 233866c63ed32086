use anyhow::{Context, Result};
use citation_finder::config::{
    default_config_path, find_config_file, get_config, load_config, save_config, ApiKeys, Config,
    LogFormat,
};
use citation_finder::mcp::McpServer;
use citation_finder::pipeline::{CitationFinder, ClientInfo};
use citation_finder::ui::{self, Spinner, Status};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Citation Finder - find peer-reviewed articles that support a passage of text
#[derive(Parser, Debug)]
#[command(name = "citation-finder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find PubMed Central articles that support a passage and cite them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Pretty output on a terminal, JSON otherwise
    Auto,
    /// Human-readable citation boxes
    Pretty,
    /// JSON format (machine-readable)
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find citations supporting a passage of text
    #[command(alias = "f")]
    Find {
        /// Passage of text (5 to 300 words)
        text: String,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Run the MCP server (for Claude Desktop and other MCP clients)
    Mcp {
        /// Serve over streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Where to write it (defaults to the user config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration with secrets masked
    Show,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let level = if cli.quiet { "error" } else { level };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("citation_finder={}", level)),
    );

    // stdout carries results and MCP frames, so logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn resolve_config(path: Option<&PathBuf>) -> Result<Config> {
    if let Some(path) = path {
        return load_config(path).with_context(|| format!("loading {}", path.display()));
    }
    match find_config_file() {
        Some(path) => load_config(&path).with_context(|| format!("loading {}", path.display())),
        None => Ok(get_config()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_ref())?;
    init_tracing(&cli, &config);

    match cli.command {
        Some(Commands::Find { ref text }) => run_find(&cli, &config, text).await,

        Some(Commands::Serve { port, ref host }) => {
            let finder = CitationFinder::from_config(&config)?;
            let mut server = config.server.clone();
            if let Some(port) = port {
                server.port = port;
            }
            if let Some(host) = host {
                server.host = host.clone();
            }
            let address = server.bind_address();
            citation_finder::api::serve(finder, &address)
                .await
                .with_context(|| format!("serving HTTP API on {}", address))
        }

        Some(Commands::Mcp { http, port, ref host }) => {
            let finder = CitationFinder::from_config(&config)?;
            let server = McpServer::new(Arc::new(finder))?;

            if http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
            Ok(())
        }

        Some(Commands::Config { ref action }) => run_config(&cli, &config, action),

        None => {
            ui::print_banner();
            Ok(())
        }
    }
}

async fn run_find(cli: &Cli, config: &Config, text: &str) -> Result<()> {
    let pretty = match cli.output {
        OutputFormat::Auto => ui::is_terminal(),
        OutputFormat::Pretty => true,
        OutputFormat::Json => false,
    };
    // The process exits right after printing, so the audit write must land first
    let finder = CitationFinder::from_config(config)?.with_awaited_audit(true);

    let spinner = (pretty && !cli.quiet).then(|| Spinner::new("Searching for supporting articles..."));
    let started = Instant::now();
    let result = finder
        .find_citations_for_passage(text, ClientInfo::local(concat!("citation-finder-cli/", env!("CARGO_PKG_VERSION"))))
        .await;

    let response = match result {
        Ok(response) => {
            if let Some(spinner) = &spinner {
                spinner.finish_with_success("Search complete");
            }
            response
        }
        Err(e) => {
            if let Some(spinner) = &spinner {
                spinner.finish_with_error("Search failed");
            }
            return Err(e.into());
        }
    };

    if !pretty {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    ui::print_search_header(&response.search_text, response.citations.len(), started.elapsed());
    if response.citations.is_empty() {
        println!();
        ui::print_status(Status::Warning, "No supporting articles found");
    }
    for (i, citation) in response.citations.iter().enumerate() {
        ui::print_citation_box(i + 1, citation);
    }
    println!();
    Ok(())
}

fn run_config(cli: &Cli, config: &Config, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { path, force } => {
            let path = path
                .clone()
                .or_else(default_config_path)
                .context("could not determine a config directory; pass --path")?;
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            // Written without credentials; keys come from the environment
            let mut template = Config::default();
            template.api_keys = ApiKeys::empty();
            save_config(&template, &path)?;
            if !cli.quiet {
                ui::print_status(Status::Success, &format!("Wrote {}", path.display()));
            }
        }
        ConfigAction::Show => {
            ui::print_section("Configuration");
            println!("{}", toml::to_string_pretty(&config.masked())?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_find_command() {
        let cli = Cli::parse_from(["citation-finder", "find", "Vitamin D reduces infection risk."]);
        match &cli.command {
            Some(Commands::Find { text }) => assert_eq!(text, "Vitamin D reduces infection risk."),
            _ => panic!("Expected Find command"),
        }
        assert_eq!(cli.output, OutputFormat::Auto);
    }

    #[test]
    fn test_cli_find_json_output() {
        let cli = Cli::parse_from(["citation-finder", "find", "text", "--output", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_cli_serve_command() {
        let cli = Cli::parse_from(["citation-finder", "serve", "--port", "9000"]);
        match &cli.command {
            Some(Commands::Serve { port, host }) => {
                assert_eq!(*port, Some(9000));
                assert!(host.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_mcp_command() {
        let cli = Cli::parse_from(["citation-finder", "mcp"]);
        match &cli.command {
            Some(Commands::Mcp { http, port, host }) => {
                assert!(!*http);
                assert_eq!(*port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Mcp command"),
        }
    }

    #[test]
    fn test_cli_config_init() {
        let cli = Cli::parse_from(["citation-finder", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Init { force: true, .. }
            })
        ));
    }

    #[test]
    fn test_cli_verbose_count() {
        let cli = Cli::parse_from(["citation-finder", "-vv", "config", "show"]);
        assert_eq!(cli.verbose, 2);
    }
}
