//! Chunked spatial index over baked tiles.

mod index;

pub(crate) use index::world_to_chunk;
pub use index::{Chunk, ChunkCoord, ChunkIndex, LayerIdx, TileRec, CHUNK_SIZE};
