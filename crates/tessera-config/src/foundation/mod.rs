//! Configuration foundation types
//!
//! Source locations and identifier rules used by every other module.

pub mod ident;
pub mod span;

pub use ident::{
    BAD_IDENTIFIER_DETAIL, is_provider_part_normalized, is_valid_identifier, parse_provider_part,
};
pub use span::{Pos, Span};
