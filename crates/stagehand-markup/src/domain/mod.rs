//! Markup domain types.

pub mod tree;
pub mod vocabulary;
