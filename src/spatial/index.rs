use crate::bake::{BakedMap, BakedTile};
use macroquad::prelude::*;
use std::collections::HashMap;

/// Chunk edge length in world pixels.
pub const CHUNK_SIZE: i32 = 256;

/// Layer position in [`BakedMap::layers`].
pub type LayerIdx = u16;

/// Integer chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

#[inline]
pub(crate) fn world_to_chunk(p: Vec2) -> ChunkCoord {
    ChunkCoord {
        x: (p.x as i32).div_euclid(CHUNK_SIZE),
        y: (p.y as i32).div_euclid(CHUNK_SIZE),
    }
}

/// One textured cell filed under a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRec {
    /// Row-major cell index into the layer's tiles
    pub cell: usize,
}

/// Per-chunk cell lists, one per layer.
#[derive(Debug, Default)]
pub struct Chunk {
    /// Cells by layer
    pub layers: HashMap<LayerIdx, Vec<TileRec>>,
}

/// Spatial bucket of every textured cell, so drawing touches only what is on screen.
#[derive(Debug, Default)]
pub struct ChunkIndex {
    /// Occupied chunks
    pub buckets: HashMap<ChunkCoord, Chunk>,
}

impl ChunkIndex {
    /// Index every textured cell of every visible layer.
    pub fn build(map: &BakedMap) -> Self {
        let mut index = ChunkIndex::default();
        for (lz, layer) in map.layers.iter().enumerate() {
            if !layer.visible {
                continue;
            }
            for (cell, tile) in layer.tiles.iter().enumerate() {
                if let BakedTile::Textured { world, .. } = tile {
                    index.add_tile(cell, lz as LayerIdx, vec2(world.x as f32, world.y as f32));
                }
            }
        }
        index
    }

    /// File `cell` of layer `layer` under the chunk containing `world`.
    pub fn add_tile(&mut self, cell: usize, layer: LayerIdx, world: Vec2) {
        self.buckets
            .entry(world_to_chunk(world))
            .or_default()
            .layers
            .entry(layer)
            .or_default()
            .push(TileRec { cell });
    }

    /// Cells of `layer` in `chunk`, if any.
    pub fn cells(&self, chunk: ChunkCoord, layer: LayerIdx) -> &[TileRec] {
        self.buckets
            .get(&chunk)
            .and_then(|c| c.layers.get(&layer))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total indexed cells.
    pub fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|c| c.layers.values())
            .map(Vec::len)
            .sum()
    }

    /// `true` when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
