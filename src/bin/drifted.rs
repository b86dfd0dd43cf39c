//! Play a baked level.

use anyhow::{Context, Result};
use clap::Parser;
use drifted::render::{draw_hud, draw_skid_marks, draw_sprite, draw_zones, MapRenderer};
use drifted::vehicle::DriftCue;
use drifted::{BakedAsset, DirImages, DriveInput, FileRecordStore, LapEvent, Level, VehicleTuning};
use macroquad::prelude::*;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const MAX_SKID_MARKS: usize = 4000;
// Long frames (window drag, mask build) would tunnel through zones.
const MAX_FRAME_TIME: f32 = 1.0 / 20.0;

#[derive(Parser)]
#[command(name = "drifted")]
#[command(about = "Top-down drift racer")]
struct Args {
    /// Baked level asset (from drifted-bake, game profile)
    asset: PathBuf,
    /// Vehicle tuning TOML
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Where `<level>-savefile.txt` records live
    #[arg(long, default_value = ".")]
    save_dir: PathBuf,
    /// Save-file key; defaults to the asset file stem
    #[arg(long)]
    level_name: Option<String>,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Drifted".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

fn read_input() -> DriveInput {
    DriveInput {
        forward: is_key_down(KeyCode::Up) || is_key_down(KeyCode::W),
        backward: is_key_down(KeyCode::Down) || is_key_down(KeyCode::S),
        left: is_key_down(KeyCode::Left) || is_key_down(KeyCode::A),
        right: is_key_down(KeyCode::Right) || is_key_down(KeyCode::D),
    }
}

/// Top-left world position so the car stays centred without showing past the map edge.
fn camera_origin(focus: Vec2, map_px: Vec2, screen: Vec2) -> Vec2 {
    let origin = focus - screen / 2.0;
    let max = (map_px - screen).max(Vec2::ZERO);
    origin.clamp(Vec2::ZERO, max)
}

async fn run(args: Args) -> Result<()> {
    let asset = BakedAsset::load(&args.asset).with_context(|| format!("Loading {}", args.asset.display()))?;
    let asset_dir = args
        .asset
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));
    let level_name = match args.level_name {
        Some(name) => name,
        None => args
            .asset
            .file_stem()
            .and_then(|s| s.to_str())
            .context("asset path has no file name")?
            .to_owned(),
    };
    let tuning = match &args.tuning {
        Some(path) => VehicleTuning::load(path).with_context(|| format!("Loading {}", path.display()))?,
        None => VehicleTuning::default(),
    };

    let mut images = DirImages::new(asset_dir);
    let store = FileRecordStore::new(&args.save_dir);
    let mut level = Level::new(level_name, asset, &mut images, tuning, store)?;

    let renderer = MapRenderer::new(level.map(), level.tileset_images());
    let car = Texture2D::from_image(level.sprite_image());
    car.set_filter(FilterMode::Nearest);
    let (map_w, map_h) = level.map().pixel_size();
    let map_px = vec2(map_w as f32, map_h as f32);

    let mut skid_marks: VecDeque<DriftCue> = VecDeque::new();
    let mut banner: Option<(String, f32)> = None;

    loop {
        if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::P) {
            let paused = !level.is_paused();
            level.set_paused(paused);
        }
        if is_key_pressed(KeyCode::R) {
            level.respawn();
        }

        let dt = get_frame_time().min(MAX_FRAME_TIME);
        if let Some(frame) = level.update(dt, read_input())? {
            if let Some(cue) = frame.step.drift_cue {
                if skid_marks.len() == MAX_SKID_MARKS {
                    skid_marks.pop_front();
                }
                skid_marks.push_back(cue);
            }
            for event in frame.events {
                match event {
                    LapEvent::MedalAchieved(medal) => banner = Some((format!("{} medal!", medal.name()), 3.0)),
                    LapEvent::LapInvalid { missed, .. } => {
                        banner = Some((format!("Missed {missed} checkpoint(s)"), 2.0))
                    }
                    _ => {}
                }
            }
        }

        let screen = vec2(screen_width(), screen_height());
        let origin = camera_origin(level.vehicle().position, map_px, screen);

        clear_background(DARKGREEN);
        renderer.draw_visible_rect(level.map(), origin, screen);
        let (front, back) = skid_marks.as_slices();
        draw_skid_marks(front, origin);
        draw_skid_marks(back, origin);
        draw_zones(level.objects(), level.timer().checkpoints_hit(), origin);

        if let Some((pos, rot)) = level.ghost_pose() {
            draw_sprite(&car, pos, rot, origin, Color::new(1.0, 1.0, 1.0, 0.35));
        }
        let vehicle = level.vehicle();
        draw_sprite(&car, vehicle.position, vehicle.rotation, origin, WHITE);
        draw_hud(level.timer(), level.is_paused());

        let expired = match &mut banner {
            Some((text, ttl)) => {
                let dims = measure_text(text.as_str(), None, 40, 1.0);
                draw_text(text.as_str(), (screen.x - dims.width) / 2.0, 80.0, 40.0, GOLD);
                *ttl -= get_frame_time();
                *ttl <= 0.0
            }
            None => false,
        };
        if expired {
            banner = None;
        }

        next_frame().await;
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drifted=info")))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
