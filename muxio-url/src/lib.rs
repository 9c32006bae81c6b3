//! URL splitting and option parsing for muxio protocol handlers
//!
//! This crate implements the `scheme://host:port?key=value&...` grammar used
//! by the transport layer, including the query-tag lookup and numeric
//! parsing conventions the handlers rely on.

pub mod query;
pub mod split;

pub use query::{find_tag, parse_flag, parse_int_prefix, split_list};
pub use split::{split_url, UrlError, UrlParts};
