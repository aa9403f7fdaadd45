//! Wire-level agenda trees, as served by the remote exports.

pub mod json;
pub mod markup;

pub use json::{parse_json, Event};
pub use markup::{clean_markup, parse_markup, Conference};
