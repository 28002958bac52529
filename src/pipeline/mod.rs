//! Frame decoding across planes, tiles and worker threads.

pub mod decoder;
/// Worker pool and unit fan-out.
pub mod scheduler;
/// Tile partitioning of planes.
pub mod tile;
