//! Stage application services.

pub mod compiler;
