//! Library surface for the GPU widget sidecar; the binary and the integration
//! tests both drive the poll loop through these modules.

pub mod config;
pub mod error;
pub mod gpu;
pub mod metrics;
pub mod payload;
pub mod procname;
pub mod props;
pub mod push;
pub mod sampler;
pub mod types;
pub mod widgets;
