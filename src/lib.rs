//! Hansard transcript → Akoma Ntoso debate XML.
//!
//! [`parse_text`] is the core: plain transcript text in, debate tree out.
//! [`parse_file`] runs the configured converter over a source document first.

pub mod akn;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod parser;

pub use akn::Document;
pub use config::Settings;
pub use error::{ParseError, Result};
pub use parser::{parse_file, parse_text, ParseOptions};
