//! size_boost: target-size media compressor
//!
//! `Compressor` is the request boundary. It classifies the upload, takes a
//! slot from the search pool, probes the source and runs the still-image or
//! animated search. The `size-boost` binary wraps it in a CLI.

pub mod dispatcher;
pub mod response;
pub mod ui;

pub use dispatcher::Compressor;
pub use response::{suggested_name, CompressRequest, CompressResponse};
