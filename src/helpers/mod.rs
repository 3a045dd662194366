//! Low-level helpers: body decoding, HTTP retrieval and text canonicalization.
pub mod encoding;
pub mod reader;
pub mod string;
