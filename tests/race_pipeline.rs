// tests/race_pipeline.rs

use base64::prelude::*;
use drifted::{
    bake_document, bake_tmx_file, parse_tmx_str, BakeProfile, BakedAsset, DriveInput, FileRecordStore,
    LapEvent, Level, MapError, Medal, MemoryImages, RecordStore, VehicleTuning,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use macroquad::color::{BLANK, WHITE};
use macroquad::texture::Image;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("drifted_{tag}_{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn gzip_b64(cells: &[u32]) -> String {
    let bytes: Vec<u8> = cells.iter().flat_map(|c| c.to_le_bytes()).collect();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&bytes).expect("gzip write");
    BASE64_STANDARD.encode(enc.finish().expect("gzip finish"))
}

/// A 10x2 strip of 16px tiles: start line on the left, one checkpoint near
/// the right end, every track cell drivable.
fn strip_tmx() -> String {
    let grass = vec![2u32; 20];
    let track = vec![1u32; 20];
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" renderorder="right-down" width="10" height="2" tilewidth="16" tileheight="16" infinite="0">
 <tileset firstgid="1" name="ground" tilewidth="16" tileheight="16" tilecount="2" columns="2">
  <image source="ground.png" width="32" height="16"/>
 </tileset>
 <layer id="1" name="grass" width="10" height="2">
  <data encoding="base64" compression="gzip">{}</data>
 </layer>
 <layer id="2" name="track" width="10" height="2">
  <data encoding="base64" compression="gzip">{}</data>
 </layer>
 <objectgroup id="3" name="Objects">
  <object id="1" name="Player" x="12" y="16">
   <properties>
    <property name="image" value="car.png"/>
    <property name="gold" value="30"/>
    <property name="silver" value="40"/>
    <property name="bronze" value="50"/>
   </properties>
   <point/>
  </object>
  <object id="2" type="Startline" x="0" y="0" width="24" height="32"/>
  <object id="3" type="Checkpoint" x="96" y="0" width="16" height="32"/>
 </objectgroup>
</map>"#,
        gzip_b64(&grass),
        gzip_b64(&track),
    )
}

fn strip_images() -> MemoryImages {
    let mut ground = Image::gen_image_color(32, 16, WHITE);
    // grass tile is see-through; only the track layer decides drivability
    for y in 0..16 {
        for x in 16..32 {
            ground.set_pixel(x, y, BLANK);
        }
    }
    MemoryImages::new()
        .with("ground.png", ground)
        .with("car.png", Image::gen_image_color(4, 4, WHITE))
}

/// Drive to the checkpoint, then back up into the start zone.
fn drive_one_lap<S: RecordStore>(level: &mut Level<S>) -> Vec<LapEvent> {
    let dt = 1.0 / 60.0;
    let mut events = Vec::new();
    for _ in 0..(60 * 30) {
        let hit = level.timer().checkpoints_hit().iter().all(|h| *h);
        let input = DriveInput {
            forward: !hit,
            backward: hit,
            ..Default::default()
        };
        let frame = level.update(dt, input).expect("update").expect("not paused");
        let done = frame
            .events
            .iter()
            .any(|e| matches!(e, LapEvent::LapCompleted { .. }));
        events.extend(frame.events);
        if done {
            return events;
        }
    }
    panic!("lap never completed; events so far: {events:?}");
}

#[test]
fn tmx_bakes_and_survives_a_json_round_trip() {
    let doc = parse_tmx_str(&strip_tmx()).expect("parse");
    let asset = bake_document(&doc, BakeProfile::Game, &mut strip_images()).expect("bake");

    assert_eq!(asset.map.pixel_size(), (160, 32));
    assert_eq!(asset.map.track_layer().map(|l| l.name.as_str()), Some("track"));
    let gameplay = asset.extras.gameplay.as_ref().expect("game profile");
    assert_eq!(gameplay.checkpoints.len(), 1);
    assert_eq!(gameplay.spawn.center, macroquad::math::vec2(2.0, 2.0));

    let again = bake_document(&doc, BakeProfile::Game, &mut strip_images()).expect("rebake");
    assert_eq!(
        asset.to_json().expect("json"),
        again.to_json().expect("json"),
        "baking is deterministic"
    );

    let dir = temp_dir("asset");
    let path = dir.join("strip.json");
    asset.save(&path).expect("save");
    assert_eq!(BakedAsset::load(&path).expect("load"), asset);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn a_driven_lap_earns_gold_and_persists() {
    let doc = parse_tmx_str(&strip_tmx()).expect("parse");
    let asset = bake_document(&doc, BakeProfile::Game, &mut strip_images()).expect("bake");
    let dir = temp_dir("lap");

    let mut level = Level::new(
        "strip",
        asset.clone(),
        &mut strip_images(),
        VehicleTuning::default(),
        FileRecordStore::new(&dir),
    )
    .expect("level");
    assert!(level.timer().is_armed(), "spawned inside the start zone");

    let events = drive_one_lap(&mut level);
    assert!(events.contains(&LapEvent::CheckpointHit(0)));
    assert!(events.contains(&LapEvent::MedalAchieved(Medal::Gold)));
    let best = level.timer().best_lap().expect("best lap");
    assert!(best > 0.0 && best < 30.0, "lap took {best}s");
    assert!(!level.timer().best_ghost().is_empty());
    assert!(level.ghost_pose().is_some());

    let save = fs::read_to_string(dir.join("strip-savefile.txt")).expect("save file");
    let lines: Vec<&str> = save.lines().collect();
    assert_eq!(lines[2], "Gold");
    let saved_best: f64 = lines[1].parse().expect("best time");
    assert!((saved_best - best).abs() < 1e-6);

    // a fresh session picks the record up on its first frame
    let mut next = Level::new(
        "strip",
        asset,
        &mut strip_images(),
        VehicleTuning::default(),
        FileRecordStore::new(&dir),
    )
    .expect("level");
    next.update(1.0 / 60.0, DriveInput::default()).expect("update");
    assert_eq!(next.timer().medal(), Medal::Gold);
    assert!((next.timer().best_lap().expect("loaded best") - best).abs() < 1e-6);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn respawn_returns_the_car_to_the_start() {
    let doc = parse_tmx_str(&strip_tmx()).expect("parse");
    let asset = bake_document(&doc, BakeProfile::Game, &mut strip_images()).expect("bake");
    let mut level = Level::new(
        "strip",
        asset,
        &mut strip_images(),
        VehicleTuning::default(),
        drifted::MemoryRecordStore::new(),
    )
    .expect("level");

    let input = DriveInput { forward: true, ..Default::default() };
    for _ in 0..30 {
        level.update(1.0 / 60.0, input).expect("update");
    }
    assert!(level.vehicle().position.x > 12.0);

    level.respawn();
    assert_eq!(level.vehicle().position, macroquad::math::vec2(12.0, 16.0));
    assert_eq!(level.vehicle().speed(), 0.0);
}

#[test]
fn respawning_after_the_checkpoints_does_not_finish_a_lap() {
    let doc = parse_tmx_str(&strip_tmx()).expect("parse");
    let asset = bake_document(&doc, BakeProfile::Game, &mut strip_images()).expect("bake");
    let mut level = Level::new(
        "strip",
        asset,
        &mut strip_images(),
        VehicleTuning::default(),
        drifted::MemoryRecordStore::new(),
    )
    .expect("level");

    let input = DriveInput { forward: true, ..Default::default() };
    let mut frames = 0;
    while !level.timer().checkpoints_hit().iter().all(|h| *h) {
        level.update(1.0 / 60.0, input).expect("update");
        frames += 1;
        assert!(frames < 60 * 10, "never reached the checkpoint");
    }

    level.respawn();
    assert_eq!(level.timer().lap_time(), 0.0);
    assert!(level.timer().checkpoints_hit().iter().all(|h| !h));

    let frame = level
        .update(1.0 / 60.0, DriveInput::default())
        .expect("update")
        .expect("not paused");
    assert!(frame.events.is_empty(), "got {:?}", frame.events);
    assert_eq!(level.timer().best_lap(), None);
    assert_eq!(level.timer().medal(), Medal::None);
    assert_eq!(level.timer().store().saves, 0);

    // driving the lap properly still works
    let events = drive_one_lap(&mut level);
    assert!(events.contains(&LapEvent::MedalAchieved(Medal::Gold)));
}

#[test]
fn baking_from_disk_reports_missing_images() {
    let dir = temp_dir("bake");
    let path = dir.join("strip.tmx");
    fs::write(&path, strip_tmx()).unwrap();

    let err = bake_tmx_file(&path, BakeProfile::Game).unwrap_err();
    match err {
        MapError::Io { path, .. } => assert!(path.ends_with("ground.png")),
        other => panic!("expected Io, got {other:?}"),
    }
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn non_tmx_paths_are_rejected() {
    let err = bake_tmx_file(std::path::Path::new("level.json"), BakeProfile::Plain).unwrap_err();
    assert!(matches!(err, MapError::UnsupportedFormat(_)));
}
