//! Work-generation core of a small stratum mining controller.
//!
//! The daemon keeps one upstream pool connection, folds the pool's
//! notifications into shared work state, paces hardware job dispatch
//! from that state, and grades the nonces the hardware returns. The
//! shipping binary is `stokerd`; everything else lives in this library
//! so the pieces stay testable on their own.

pub mod asic;
pub mod board;
pub mod config;
pub mod daemon;
pub mod difficulty;
pub mod registry;
pub mod results;
pub mod stratum;
pub mod telemetry;
pub mod tracing;
pub mod work;
