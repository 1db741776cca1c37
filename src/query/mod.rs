//! # Query Module
//!
//! Wire-format decoding for inbound request data.
//!
//! ## Overview
//!
//! Query strings arrive flat, with nesting expressed through brackets:
//!
//! ```text
//! filter[date][from]=2024-01-01&filter[date][to]=2024-02-01&tag=a&tag=b
//! ```
//!
//! [`QueryMap`] keeps every value of a repeated key in arrival order, and
//! [`decode`] turns the flat keys into a nested JSON object whose leaves are
//! arrays of strings (a value that is not UTF-8 stays an array of its bytes):
//!
//! ```json
//! {"filter": {"date": {"from": ["2024-01-01"], "to": ["2024-02-01"]}}, "tag": ["a", "b"]}
//! ```
//!
//! Picking the last value of a repeated key happens later, when a field is
//! cast, so a sequence-typed parameter can still consume the whole list.
//!
//! [`merge`] folds a parsed JSON body into the decoded query. Body values win
//! key by key at every nesting level; siblings that only the query supplied
//! survive.

mod decode;
mod map;

pub use decode::{decode, merge};
pub use map::QueryMap;
