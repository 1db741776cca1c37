//! # CLI Module
//!
//! The `sigbind` binary: small tools for seeing what an endpoint will receive.
//!
//! ## Commands
//!
//! ### `decode`
//!
//! Decode a bracketed query string, merge an optional JSON body over it and
//! print the result:
//!
//! ```bash
//! sigbind decode --query 'filter[date][from]=2024-01-01&tag=a&tag=b' --body '{"tag": ["c"]}'
//! # {"filter":{"date":{"from":["2024-01-01"]}},"tag":["c"]}
//! ```
//!
//! Options:
//! - `--query <QS>` - query string, with or without `?`
//! - `--body <JSON>` / `--body-file <FILE>` - request body
//! - `--latin1` - decode the body as ISO-8859-1
//! - `--pretty` - indent the output
//!
//! ### `config`
//!
//! Print the effective [`RuntimeConfig`](crate::runtime_config::RuntimeConfig):
//!
//! ```bash
//! SIGBIND_UNKNOWN_FIELDS=exclude sigbind config --file sigbind.yaml --format json
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{decode_input, run, run_cli, Cli, Commands, OutputFormat};
