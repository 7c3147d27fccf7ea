// Claim Verifier - API Core
//
// Verifies natural-language claims against a pre-built vector index of
// evidence: embed the claim, retrieve neighbors (with a lexical fallback),
// score them and synthesize a verdict grounded in the retrieved evidence.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
