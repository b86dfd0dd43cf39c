use crate::spatial::{world_to_chunk, ChunkCoord, ChunkIndex};
use macroquad::prelude::*;

const CULL_MARGIN_CHUNKS: i32 = 1;

/// Occupied chunks overlapping the world-space rect, padded by one chunk,
/// in row-major `(y, x)` order.
pub fn visible_chunks(index: &ChunkIndex, view_min: Vec2, view_max: Vec2) -> Vec<ChunkCoord> {
    let a = world_to_chunk(view_min);
    let b = world_to_chunk(view_max);
    let (x0, x1) = (a.x.min(b.x) - CULL_MARGIN_CHUNKS, a.x.max(b.x) + CULL_MARGIN_CHUNKS);
    let (y0, y1) = (a.y.min(b.y) - CULL_MARGIN_CHUNKS, a.y.max(b.y) + CULL_MARGIN_CHUNKS);

    let mut coords: Vec<ChunkCoord> = index
        .buckets
        .keys()
        .filter(|c| (x0..=x1).contains(&c.x) && (y0..=y1).contains(&c.y))
        .copied()
        .collect();
    coords.sort_by_key(|c| (c.y, c.x));
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_chunks_are_padded_and_in_stable_order() {
        let mut index = ChunkIndex::default();
        index.add_tile(0, 0, vec2(520.0, 520.0)); // (2,2)
        index.add_tile(1, 0, vec2(0.0, 0.0)); // (0,0)
        index.add_tile(2, 0, vec2(260.0, 0.0)); // (1,0)
        index.add_tile(3, 0, vec2(0.0, 260.0)); // (0,1)
        index.add_tile(4, 0, vec2(2600.0, 2600.0)); // (10,10)

        let coords = visible_chunks(&index, vec2(0.0, 0.0), vec2(300.0, 300.0));
        assert_eq!(
            coords,
            vec![
                ChunkCoord { x: 0, y: 0 },
                ChunkCoord { x: 1, y: 0 },
                ChunkCoord { x: 0, y: 1 },
                ChunkCoord { x: 2, y: 2 },
            ]
        );
    }
}
