//! Chunk planning.
//!
//! Splits a resolved span into block-sized fetch units and groups them into
//! batches of at most `pool_size` units, one batch per dispatch round.

mod batches;
mod unit;

pub use batches::ChunkPlan;
pub use unit::FetchUnit;
