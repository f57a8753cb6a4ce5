//! Work generation: from pool announcements to accelerator-ready jobs.

pub mod builder;
pub mod extranonce2;
pub mod interval;
pub mod job;
pub mod merkle;
pub mod state;

#[cfg(test)]
pub mod test_blocks;

pub use builder::AsicAttachment;
pub use state::WorkState;
