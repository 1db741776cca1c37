use crate::dispatcher::{ApiRequest, BodyEncoding};
use crate::query::{decode, merge, QueryMap};
use crate::runtime_config::RuntimeConfig;
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use http::Method;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

/// Command-line tools for inspecting request decoding and configuration.
#[derive(Parser, Debug)]
#[command(name = "sigbind")]
#[command(about = "sigbind request decoding tools", long_about = None, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a query string (and optional JSON body) the way an endpoint sees it
    Decode {
        /// Query string, with or without the leading `?`
        #[arg(short, long, default_value = "")]
        query: String,

        /// Inline JSON body, merged over the query
        #[arg(short, long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the JSON body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,

        /// Decode the body as ISO-8859-1 instead of UTF-8
        #[arg(long, default_value_t = false)]
        latin1: bool,

        /// Pretty-print the result
        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
    /// Print the effective runtime configuration
    Config {
        /// YAML file to load before environment overrides
        #[arg(short, long, env = "SIGBIND_CONFIG")]
        file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Parse the process arguments and run.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(&cli, &mut stdout.lock())
}

/// Run `cli`, writing command output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Decode {
            query,
            body,
            body_file,
            latin1,
            pretty,
        } => {
            let body = match (body, body_file) {
                (Some(inline), _) => Some(inline.as_bytes().to_vec()),
                (None, Some(path)) => Some(
                    std::fs::read(path)
                        .with_context(|| format!("failed to read body file {}", path.display()))?,
                ),
                (None, None) => None,
            };
            let decoded = decode_input(query, body, *latin1)?;
            let text = if *pretty {
                serde_json::to_string_pretty(&decoded)?
            } else {
                serde_json::to_string(&decoded)?
            };
            writeln!(out, "{text}")?;
        }
        Commands::Config { file, format } => {
            let config = RuntimeConfig::load(file.as_deref())?;
            match format {
                OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&config)?)?,
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?,
            }
        }
    }
    Ok(())
}

/// Decoded query with the body merged on top.
pub fn decode_input(query: &str, body: Option<Vec<u8>>, latin1: bool) -> anyhow::Result<Value> {
    let mut data = decode(&QueryMap::parse(query));
    if let Some(body) = body {
        let encoding = if latin1 {
            BodyEncoding::Latin1
        } else {
            BodyEncoding::Utf8
        };
        let request = ApiRequest::new(Method::POST, "/")
            .with_body(body)
            .with_encoding(encoding);
        let parsed = request
            .json_body()
            .map_err(|err| anyhow::anyhow!("{}", err.response()))?;
        if let Some(parsed) = parsed {
            merge(parsed, &mut data);
        }
    }
    Ok(Value::Object(data))
}
