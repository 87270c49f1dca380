//! Token service front end
//!
//! Resolves the caller's identity for read and write requests and serves
//! them over HTTP.

pub mod http;
pub mod requests;

pub use http::{create_router, run_http_server, HttpState, DEFAULT_IDENTITY_HEADER};
pub use requests::{read_token, write_token, TokenResponse};
