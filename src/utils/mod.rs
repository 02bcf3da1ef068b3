//! Utility functions

pub mod http;

pub use http::*;
