//! Macroquad drawing for baked maps, the vehicle, its ghost and the HUD.
//!
//! Everything draws in screen space: `origin` is the world position shown at
//! the top-left corner of the window.

mod cull;

pub use cull::visible_chunks;

use crate::bake::{BakedMap, BakedTile};
use crate::gameplay::GameplayObjects;
use crate::lap::LapTimer;
use crate::record::{Medal, RecordStore};
use crate::spatial::{ChunkIndex, LayerIdx};
use crate::vehicle::DriftCue;
use macroquad::prelude::*;

/// GPU textures plus the chunk index for one baked map.
pub struct MapRenderer {
    textures: Vec<Texture2D>,
    index: ChunkIndex,
}

impl MapRenderer {
    /// Upload `images` (parallel to `map.textures`) and index the map.
    pub fn new(map: &BakedMap, images: &[Image]) -> Self {
        let textures = images
            .iter()
            .map(|img| {
                let tex = Texture2D::from_image(img);
                tex.set_filter(FilterMode::Nearest);
                tex
            })
            .collect();
        Self {
            textures,
            index: ChunkIndex::build(map),
        }
    }

    /// Draw every visible layer in order, culled to the view.
    pub fn draw_visible_rect(&self, map: &BakedMap, origin: Vec2, view_size: Vec2) {
        let chunks = visible_chunks(&self.index, origin, origin + view_size);

        for (lz, layer) in map.layers.iter().enumerate() {
            if !layer.visible {
                continue;
            }
            let tint = Color::new(1.0, 1.0, 1.0, layer.opacity);
            for &chunk in &chunks {
                for rec in self.index.cells(chunk, lz as LayerIdx) {
                    if let Some(tile) = layer.tiles.get(rec.cell) {
                        self.draw_tile(tile, origin, tint);
                    }
                }
            }
        }
    }

    fn draw_tile(&self, tile: &BakedTile, origin: Vec2, tint: Color) {
        let BakedTile::Textured {
            source,
            world,
            center,
            texture,
            rotation,
            flip_horizontal,
            flip_vertical,
        } = tile
        else {
            return;
        };
        let Some(tex) = self.textures.get(*texture) else {
            return;
        };

        let x = world.x as f32 - origin.x;
        let y = world.y as f32 - origin.y;
        draw_texture_ex(
            tex,
            x,
            y,
            tint,
            DrawTextureParams {
                source: Some(source.to_rect()),
                dest_size: Some(vec2(world.w as f32, world.h as f32)),
                rotation: *rotation,
                flip_x: *flip_horizontal,
                flip_y: *flip_vertical,
                pivot: Some(vec2(x, y) + *center),
            },
        );
    }
}

/// Draw a sprite centred on `position`, rotated about its centre.
pub fn draw_sprite(texture: &Texture2D, position: Vec2, rotation: f32, origin: Vec2, tint: Color) {
    let size = vec2(texture.width(), texture.height());
    let top_left = position - origin - size / 2.0;
    draw_texture_ex(
        texture,
        top_left.x,
        top_left.y,
        tint,
        DrawTextureParams {
            rotation,
            pivot: Some(position - origin),
            ..Default::default()
        },
    );
}

/// Outline checkpoints (green once touched) and the start line.
pub fn draw_zones(objects: &GameplayObjects, hits: &[bool], origin: Vec2) {
    for (i, zone) in objects.checkpoints.iter().enumerate() {
        let color = if hits.get(i).copied().unwrap_or(false) { GREEN } else { YELLOW };
        draw_rectangle_lines(zone.x - origin.x, zone.y - origin.y, zone.width, zone.height, 2.0, color);
    }
    let s = &objects.startline;
    draw_rectangle_lines(s.x - origin.x, s.y - origin.y, s.width, s.height, 2.0, WHITE);
}

/// Dark tire marks where the car drifted.
pub fn draw_skid_marks(marks: &[DriftCue], origin: Vec2) {
    for mark in marks {
        let p = mark.position - origin;
        draw_circle(p.x, p.y, 2.0 + 2.0 * mark.intensity, Color::new(0.1, 0.1, 0.1, 0.35));
    }
}

fn medal_color(medal: Medal) -> Color {
    match medal {
        Medal::Gold => GOLD,
        Medal::Silver => LIGHTGRAY,
        Medal::Bronze => ORANGE,
        Medal::None => WHITE,
    }
}

/// Lap time, last and best laps, medal.
pub fn draw_hud<S: RecordStore>(timer: &LapTimer<S>, paused: bool) {
    let secs = |t: Option<f64>| t.map_or_else(|| "--".to_owned(), |t| format!("{t:.2}s"));

    draw_text(&format!("Lap: {:.2}s", timer.lap_time()), 20.0, 30.0, 28.0, WHITE);
    draw_text(&format!("Last: {}", secs(timer.last_lap())), 20.0, 58.0, 24.0, WHITE);

    let medal = timer.medal();
    let best = match medal {
        Medal::None => format!("Best: {}", secs(timer.best_lap())),
        m => format!("Best: {} ({})", secs(timer.best_lap()), m.name()),
    };
    draw_text(&best, 20.0, 84.0, 24.0, medal_color(medal));

    let m = timer.thresholds();
    draw_text(
        &format!("Gold {:.2}s  Silver {:.2}s  Bronze {:.2}s", m.gold, m.silver, m.bronze),
        20.0,
        110.0,
        20.0,
        GRAY,
    );

    if paused {
        let text = "PAUSED";
        let dims = measure_text(text, None, 48, 1.0);
        draw_text(
            text,
            (screen_width() - dims.width) / 2.0,
            screen_height() / 2.0,
            48.0,
            WHITE,
        );
    }
}
