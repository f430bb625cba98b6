//! # fedit-cli
//!
//! Offline helpers around a fedit deployment.
//!
//! ```bash
//! # How to call every registered adapter
//! fedit adapter-help
//! fedit adapter-help block
//!
//! # Inspect shared-context tokens
//! fedit context encode --secret s3cret '{"block_id": "b-1", "movable": true}'
//! fedit context decode --secret s3cret '<token>'
//! ```

pub mod commands;

pub use commands::{adapter_help, decode_context, encode_context, CliError};
