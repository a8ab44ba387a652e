//! Cross-cutting utilities used by the scheduler, block pipeline and
//! entropy/transform stages.
//!
//! Submodules:
//! - [`cores`]     — CPU core counting via [`std::thread::available_parallelism`]
//! - [`checksum`]  — XXHash32-compatible block checksum
//! - [`histogram`] - byte/order-1 frequency tables used by entropy codecs and
//!                   the `skipBlocks` incompressibility estimate

pub mod checksum;
pub mod cores;
pub mod histogram;

pub use checksum::{block_checksum, Hasher32};
pub use cores::count_cores;
pub use histogram::{order0_histogram, order0_entropy};
