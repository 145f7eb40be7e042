//! Pass-through to the external text-generation API.
//!
//! The downstream service is opaque: it is only reached after the auth gate
//! admits the request, and its failures surface as a generic 502.

pub mod client;
pub mod handlers;

pub use client::GenerationClient;
pub use handlers::translate_mos;
