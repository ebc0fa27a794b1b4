//! Low-level text utilities shared by the vellum crates: character
//! classification and grapheme-cluster boundary traversal over ropes.

pub mod chars;
pub mod grapheme;
