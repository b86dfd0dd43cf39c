//! Object-group extraction: typed gameplay and UI records pulled out of the
//! map's `"Objects"` group (or `"sprites"` for hero maps), selected by a
//! [`BakeProfile`].

use crate::bake::vec2_serde;
use crate::document::{ObjectGroup, TiledDocument, TiledObject};
use crate::error::MapError;
use crate::images::{image_size, ImageSource};
use crate::record::Medal;
use macroquad::math::{vec2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Name of the object group every profile except [`BakeProfile::Plain`] reads.
pub const OBJECTS_GROUP: &str = "Objects";
/// Group holding the `hero` object in the simplest map convention.
pub const SPRITES_GROUP: &str = "sprites";

/// Which records to pull out of the object layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BakeProfile {
    /// Tile layers only
    Plain,
    /// Player spawn, checkpoints, start line, medal thresholds
    #[default]
    Game,
    /// Spawn only: `sprites`/`hero`, or `Objects`/`Player` with just an image
    Hero,
    /// `Text` and `Title` anchors
    Intro,
    /// Intro anchors plus `LevelTile` entries
    Menu,
    /// One `Text` anchor: the label centre
    Button,
    /// Level name and the three medal time anchors
    LevelScreen,
}

impl BakeProfile {
    /// Command-line spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            BakeProfile::Plain => "plain",
            BakeProfile::Game => "game",
            BakeProfile::Hero => "hero",
            BakeProfile::Intro => "intro",
            BakeProfile::Menu => "menu",
            BakeProfile::Button => "button",
            BakeProfile::LevelScreen => "level-screen",
        }
    }
}

impl fmt::Display for BakeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BakeProfile {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "plain" => BakeProfile::Plain,
            "game" => BakeProfile::Game,
            "hero" => BakeProfile::Hero,
            "intro" => BakeProfile::Intro,
            "menu" => BakeProfile::Menu,
            "button" => BakeProfile::Button,
            "level-screen" => BakeProfile::LevelScreen,
            other => return Err(MapError::UnsupportedFormat(format!("unknown bake profile '{other}'"))),
        })
    }
}

/// Axis-aligned rectangle in world pixels (checkpoint or start line).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Zone {
    /// Edge-inclusive containment.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// As a macroquad rect.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn from_object(obj: &TiledObject) -> Self {
        if obj.rotation != 0.0 {
            warn!(object = obj.label(), rotation = obj.rotation, "zone rotation ignored; zones are axis-aligned");
        }
        Self {
            x: obj.x,
            y: obj.y,
            width: obj.width,
            height: obj.height,
        }
    }
}

/// Lap-time thresholds in seconds; `gold < silver < bronze`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedalThresholds {
    /// Beat this for gold
    pub gold: f64,
    /// Beat this for silver
    pub silver: f64,
    /// Beat this for bronze
    pub bronze: f64,
}

impl MedalThresholds {
    /// Validated constructor.
    pub fn new(gold: f64, silver: f64, bronze: f64) -> Result<Self, MapError> {
        if !(gold < silver && silver < bronze) {
            return Err(MapError::InvalidMedalThresholds { gold, silver, bronze });
        }
        Ok(Self { gold, silver, bronze })
    }

    /// Tier earned by a lap time; first strictly-beaten threshold wins.
    pub fn medal_for(&self, seconds: f64) -> Medal {
        if seconds < self.gold {
            Medal::Gold
        } else if seconds < self.silver {
            Medal::Silver
        } else if seconds < self.bronze {
            Medal::Bronze
        } else {
            Medal::None
        }
    }
}

/// Where and how the player's vehicle starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpawn {
    /// Sprite centre in world pixels
    #[serde(with = "vec2_serde")]
    pub position: Vec2,
    /// Vehicle sprite path, relative to the map
    pub texture: String,
    /// Sprite pivot, half the sprite size
    #[serde(with = "vec2_serde")]
    pub center: Vec2,
    /// Initial heading in radians
    pub rotation: f32,
}

/// Everything the race simulation needs from the object layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameplayObjects {
    /// Player start
    pub spawn: PlayerSpawn,
    /// Checkpoints in authoring order
    pub checkpoints: Vec<Zone>,
    /// Start / finish line
    pub startline: Zone,
    /// Medal times
    pub medals: MedalThresholds,
}

/// `Text` is body copy, `Title` is a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextStyle {
    /// Regular text
    Text,
    /// Title text
    Title,
}

/// A positioned piece of UI text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnchor {
    /// Object (x, y)
    #[serde(with = "vec2_serde")]
    pub position: Vec2,
    /// The `value` property
    pub value: String,
    /// Text or title
    pub style: TextStyle,
}

/// A selectable level on the menu map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEntry {
    /// Object (x, y)
    #[serde(with = "vec2_serde")]
    pub position: Vec2,
    /// Level name from the `value` property
    pub level: String,
}

/// Anchor points on the per-level summary screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelScreenAnchors {
    /// `LevelName` object
    #[serde(with = "vec2_serde")]
    pub name: Vec2,
    /// `GoldTime` object
    #[serde(with = "vec2_serde")]
    pub gold: Vec2,
    /// `SilverTime` object
    #[serde(with = "vec2_serde")]
    pub silver: Vec2,
    /// `BronzeTime` object
    #[serde(with = "vec2_serde")]
    pub bronze: Vec2,
}

/// Optional records riding along with a baked map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapExtras {
    /// Profile the map was baked with
    pub profile: BakeProfile,
    /// Race data (game maps)
    pub gameplay: Option<GameplayObjects>,
    /// Lone spawn point (hero maps)
    #[serde(default)]
    pub spawn: Option<PlayerSpawn>,
    /// Text and title anchors (intro/menu maps)
    pub texts: Vec<TextAnchor>,
    /// Level tiles (menu maps)
    pub levels: Vec<LevelEntry>,
    /// Label centre (button maps)
    #[serde(with = "opt_vec2")]
    pub button_label: Option<Vec2>,
    /// Summary anchors (level screen maps)
    pub level_screen: Option<LevelScreenAnchors>,
}

mod opt_vec2 {
    use macroquad::math::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec2>, s: S) -> Result<S::Ok, S::Error> {
        v.map(|v| [v.x, v.y]).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec2>, D::Error> {
        Ok(Option::<[f32; 2]>::deserialize(d)?.map(|[x, y]| Vec2::new(x, y)))
    }
}

impl MapExtras {
    /// Race data present.
    pub fn has_gameplay_objects(&self) -> bool {
        self.gameplay.is_some()
    }

    /// A spawn point is present, either on its own or as part of race data.
    pub fn has_spawn(&self) -> bool {
        self.spawn.is_some() || self.gameplay.is_some()
    }

    /// Any UI text anchor present.
    pub fn has_text_anchors(&self) -> bool {
        !self.texts.is_empty() || self.button_label.is_some() || self.level_screen.is_some()
    }
}

fn objects_group(doc: &TiledDocument) -> Result<&ObjectGroup, MapError> {
    info!(count = doc.object_groups.len(), "object groups found");
    doc.object_group(OBJECTS_GROUP)
        .ok_or_else(|| MapError::MissingObjectGroup(OBJECTS_GROUP.into()))
}

/// Exactly one object of `kind`, by type.
fn single<'a>(group: &'a ObjectGroup, kind: &'a str) -> Result<&'a TiledObject, MapError> {
    let mut found = group.of_type(kind);
    let first = found.next().ok_or_else(|| MapError::MissingObject {
        group: group.name.clone(),
        kind: kind.into(),
    })?;
    if found.next().is_some() {
        return Err(MapError::DuplicateObject {
            group: group.name.clone(),
            kind: kind.into(),
        });
    }
    Ok(first)
}

fn required_prop<'a>(obj: &'a TiledObject, property: &str) -> Result<&'a str, MapError> {
    obj.properties
        .get_string(property)
        .ok_or_else(|| MapError::MissingProperty {
            object: obj.label().into(),
            property: property.into(),
        })
}

fn parsed_prop<T: FromStr>(obj: &TiledObject, property: &str) -> Result<T, MapError> {
    let raw = required_prop(obj, property)?;
    raw.trim().parse().map_err(|_| MapError::InvalidProperty {
        object: obj.label().into(),
        property: property.into(),
        value: raw.into(),
    })
}

fn position(obj: &TiledObject) -> Vec2 {
    vec2(obj.x, obj.y)
}

/// The player object: named `Player`, or failing that typed `Player`.
fn player_object(group: &ObjectGroup) -> Result<&TiledObject, MapError> {
    let by_name: Vec<_> = group.objects.iter().filter(|o| o.name == "Player").collect();
    match by_name.as_slice() {
        [one] => Ok(one),
        [] => single(group, "Player"),
        _ => Err(MapError::DuplicateObject {
            group: group.name.clone(),
            kind: "Player".into(),
        }),
    }
}

/// Spawn from an object carrying an `image` property and an optional
/// `rotation` in degrees.
fn spawn_from(obj: &TiledObject, images: &mut dyn ImageSource) -> Result<PlayerSpawn, MapError> {
    let texture = required_prop(obj, "image")?.to_owned();
    let rotation_deg: f32 = match obj.properties.get_string("rotation") {
        Some(_) => parsed_prop(obj, "rotation")?,
        None => obj.rotation,
    };
    let (w, h) = image_size(images.image(&texture)?);
    let spawn = PlayerSpawn {
        position: position(obj),
        texture,
        center: vec2(w as f32 / 2.0, h as f32 / 2.0),
        rotation: rotation_deg.to_radians(),
    };
    info!(x = spawn.position.x, y = spawn.position.y, image = %spawn.texture, "player spawn");
    Ok(spawn)
}

/// `sprites`/`hero` when that group exists, else the `Objects` player.
fn extract_hero(doc: &TiledDocument, images: &mut dyn ImageSource) -> Result<PlayerSpawn, MapError> {
    let hero = match doc.object_group(SPRITES_GROUP) {
        Some(group) => group
            .objects
            .iter()
            .find(|o| o.name == "hero")
            .ok_or_else(|| MapError::MissingObject {
                group: group.name.clone(),
                kind: "hero".into(),
            })?,
        None => player_object(objects_group(doc)?)?,
    };
    spawn_from(hero, images)
}

fn extract_gameplay(
    group: &ObjectGroup,
    images: &mut dyn ImageSource,
) -> Result<GameplayObjects, MapError> {
    let player = player_object(group)?;
    let spawn = spawn_from(player, images)?;

    let medals = MedalThresholds::new(
        parsed_prop(player, "gold")?,
        parsed_prop(player, "silver")?,
        parsed_prop(player, "bronze")?,
    )?;
    info!(gold = medals.gold, silver = medals.silver, bronze = medals.bronze, "medal thresholds");

    let checkpoints: Vec<Zone> = group.of_type("Checkpoint").map(Zone::from_object).collect();
    let startline = Zone::from_object(single(group, "Startline")?);
    info!(checkpoints = checkpoints.len(), "race zones");

    Ok(GameplayObjects {
        spawn,
        checkpoints,
        startline,
        medals,
    })
}

fn text_anchors(group: &ObjectGroup) -> Result<Vec<TextAnchor>, MapError> {
    let mut out = Vec::new();
    for (kind, style) in [("Text", TextStyle::Text), ("Title", TextStyle::Title)] {
        for obj in group.of_type(kind) {
            out.push(TextAnchor {
                position: position(obj),
                value: required_prop(obj, "value")?.to_owned(),
                style,
            });
        }
    }
    Ok(out)
}

/// Pull the records `profile` asks for out of the map's `"Objects"` group.
///
/// Missing groups, objects or properties fail the bake. `images` is only
/// consulted for the player sprite size.
pub fn extract_extras(
    doc: &TiledDocument,
    profile: BakeProfile,
    images: &mut dyn ImageSource,
) -> Result<MapExtras, MapError> {
    let mut extras = MapExtras {
        profile,
        ..Default::default()
    };
    match profile {
        BakeProfile::Plain => return Ok(extras),
        BakeProfile::Hero => {
            extras.spawn = Some(extract_hero(doc, images)?);
            return Ok(extras);
        }
        _ => {}
    }

    let group = objects_group(doc)?;
    match profile {
        BakeProfile::Plain | BakeProfile::Hero => {}
        BakeProfile::Game => extras.gameplay = Some(extract_gameplay(group, images)?),
        BakeProfile::Intro => extras.texts = text_anchors(group)?,
        BakeProfile::Menu => {
            extras.texts = text_anchors(group)?;
            extras.levels = group
                .of_type("LevelTile")
                .map(|obj| {
                    Ok(LevelEntry {
                        position: position(obj),
                        level: required_prop(obj, "value")?.to_owned(),
                    })
                })
                .collect::<Result<_, MapError>>()?;
        }
        BakeProfile::Button => extras.button_label = Some(position(single(group, "Text")?)),
        BakeProfile::LevelScreen => {
            extras.level_screen = Some(LevelScreenAnchors {
                name: position(single(group, "LevelName")?),
                gold: position(single(group, "GoldTime")?),
                silver: position(single(group, "SilverTime")?),
                bronze: position(single(group, "BronzeTime")?),
            });
        }
    }
    Ok(extras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Properties;
    use crate::images::MemoryImages;
    use macroquad::color::WHITE;
    use macroquad::texture::Image;

    fn object(name: &str, kind: &str, x: f32, y: f32, props: &[(&str, &str)]) -> TiledObject {
        let mut properties = Properties::new();
        for (k, v) in props {
            properties.insert(*k, *v);
        }
        TiledObject {
            name: name.into(),
            kind: kind.into(),
            x,
            y,
            width: 32.0,
            height: 16.0,
            visible: true,
            properties,
            ..Default::default()
        }
    }

    fn doc_with(objects: Vec<TiledObject>) -> TiledDocument {
        TiledDocument {
            object_groups: vec![ObjectGroup {
                name: OBJECTS_GROUP.into(),
                objects,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn car_images() -> MemoryImages {
        MemoryImages::new().with("car.png", Image::gen_image_color(12, 20, WHITE))
    }

    fn player(gold: &str) -> TiledObject {
        object(
            "Player",
            "",
            100.0,
            50.0,
            &[("image", "car.png"), ("rotation", "90"), ("gold", gold), ("silver", "20"), ("bronze", "30")],
        )
    }

    #[test]
    fn game_profile_extracts_spawn_zones_and_medals() {
        let doc = doc_with(vec![
            player("10"),
            object("", "Checkpoint", 10.0, 10.0, &[]),
            object("", "Startline", 0.0, 0.0, &[]),
            object("", "Checkpoint", 40.0, 10.0, &[]),
        ]);
        let extras = extract_extras(&doc, BakeProfile::Game, &mut car_images()).expect("extract");
        let game = extras.gameplay.as_ref().expect("gameplay");

        assert_eq!(game.spawn.position, vec2(100.0, 50.0));
        assert_eq!(game.spawn.center, vec2(6.0, 10.0));
        assert!((game.spawn.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(game.checkpoints.len(), 2);
        assert_eq!(game.checkpoints[1].x, 40.0);
        assert_eq!(game.startline.width, 32.0);
        assert!(extras.has_gameplay_objects());
        assert!(!extras.has_text_anchors());
    }

    #[test]
    fn hero_profile_reads_the_sprites_group() {
        let doc = TiledDocument {
            object_groups: vec![ObjectGroup {
                name: SPRITES_GROUP.into(),
                objects: vec![
                    object("tree", "", 1.0, 1.0, &[]),
                    object("hero", "", 64.0, 48.0, &[("image", "car.png")]),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let extras = extract_extras(&doc, BakeProfile::Hero, &mut car_images()).expect("hero");
        let spawn = extras.spawn.as_ref().expect("spawn");
        assert_eq!(spawn.position, vec2(64.0, 48.0));
        assert_eq!(spawn.center, vec2(6.0, 10.0));
        assert_eq!(spawn.rotation, 0.0);
        assert!(extras.has_spawn());
        assert!(!extras.has_gameplay_objects());
    }

    #[test]
    fn hero_profile_falls_back_to_an_image_only_player() {
        // no medals, no start line
        let doc = doc_with(vec![object("Player", "", 30.0, 40.0, &[("image", "car.png")])]);
        let extras = extract_extras(&doc, BakeProfile::Hero, &mut car_images()).expect("player");
        assert_eq!(extras.spawn.expect("spawn").position, vec2(30.0, 40.0));
        assert!(extras.gameplay.is_none());

        let doc = TiledDocument {
            object_groups: vec![ObjectGroup {
                name: SPRITES_GROUP.into(),
                objects: vec![object("villain", "", 0.0, 0.0, &[("image", "car.png")])],
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = extract_extras(&doc, BakeProfile::Hero, &mut car_images()).expect_err("no hero");
        assert!(matches!(err, MapError::MissingObject { kind, .. } if kind == "hero"));
    }

    #[test]
    fn medal_tiers_use_strict_comparisons() {
        let m = MedalThresholds::new(10.0, 20.0, 30.0).expect("ordered");
        assert_eq!(m.medal_for(9.5), Medal::Gold);
        assert_eq!(m.medal_for(10.0), Medal::Silver);
        assert_eq!(m.medal_for(15.0), Medal::Silver);
        assert_eq!(m.medal_for(25.0), Medal::Bronze);
        assert_eq!(m.medal_for(35.0), Medal::None);
    }

    #[test]
    fn unordered_thresholds_fail_the_bake() {
        let doc = doc_with(vec![player("25"), object("", "Startline", 0.0, 0.0, &[])]);
        let err = extract_extras(&doc, BakeProfile::Game, &mut car_images()).expect_err("order");
        assert!(matches!(err, MapError::InvalidMedalThresholds { .. }));
    }

    #[test]
    fn missing_pieces_are_reported() {
        let err = extract_extras(&TiledDocument::default(), BakeProfile::Game, &mut car_images())
            .expect_err("no group");
        assert!(matches!(err, MapError::MissingObjectGroup(g) if g == "Objects"));

        let doc = doc_with(vec![player("10")]);
        let err = extract_extras(&doc, BakeProfile::Game, &mut car_images()).expect_err("no startline");
        assert!(matches!(err, MapError::MissingObject { kind, .. } if kind == "Startline"));

        let doc = doc_with(vec![
            player("10"),
            object("", "Startline", 0.0, 0.0, &[]),
            object("", "Startline", 5.0, 0.0, &[]),
        ]);
        let err = extract_extras(&doc, BakeProfile::Game, &mut car_images()).expect_err("two lines");
        assert!(matches!(err, MapError::DuplicateObject { .. }));

        let doc = doc_with(vec![object("", "Title", 0.0, 0.0, &[])]);
        let err = extract_extras(&doc, BakeProfile::Intro, &mut car_images()).expect_err("no value");
        assert!(matches!(err, MapError::MissingProperty { property, .. } if property == "value"));
    }

    #[test]
    fn bad_number_is_an_invalid_property() {
        let doc = doc_with(vec![player("fast"), object("", "Startline", 0.0, 0.0, &[])]);
        let err = extract_extras(&doc, BakeProfile::Game, &mut car_images()).expect_err("nan");
        assert!(matches!(err, MapError::InvalidProperty { value, .. } if value == "fast"));
    }

    #[test]
    fn ui_profiles_collect_anchors() {
        let doc = doc_with(vec![
            object("", "Title", 5.0, 6.0, &[("value", "Drifted")]),
            object("", "Text", 1.0, 2.0, &[("value", "Press Enter")]),
            object("", "LevelTile", 7.0, 8.0, &[("value", "oval")]),
        ]);
        let intro = extract_extras(&doc, BakeProfile::Intro, &mut car_images()).expect("intro");
        assert_eq!(intro.texts.len(), 2);
        assert_eq!(intro.texts[0].style, TextStyle::Text);
        assert_eq!(intro.texts[1].value, "Drifted");
        assert!(intro.levels.is_empty());

        let menu = extract_extras(&doc, BakeProfile::Menu, &mut car_images()).expect("menu");
        assert_eq!(menu.levels[0].level, "oval");

        let button = extract_extras(&doc, BakeProfile::Button, &mut car_images()).expect("button");
        assert_eq!(button.button_label, Some(vec2(1.0, 2.0)));
        assert!(button.has_text_anchors());

        let doc = doc_with(vec![
            object("", "LevelName", 1.0, 1.0, &[]),
            object("", "GoldTime", 2.0, 2.0, &[]),
            object("", "SilverTime", 3.0, 3.0, &[]),
            object("", "BronzeTime", 4.0, 4.0, &[]),
        ]);
        let screen = extract_extras(&doc, BakeProfile::LevelScreen, &mut car_images()).expect("screen");
        assert_eq!(screen.level_screen.expect("anchors").bronze, vec2(4.0, 4.0));
    }

    #[test]
    fn profile_names_round_trip_through_from_str() {
        for p in [
            BakeProfile::Plain,
            BakeProfile::Game,
            BakeProfile::Hero,
            BakeProfile::Intro,
            BakeProfile::Menu,
            BakeProfile::Button,
            BakeProfile::LevelScreen,
        ] {
            assert_eq!(p.as_str().parse::<BakeProfile>().expect("parse"), p);
        }
        assert!("heroes".parse::<BakeProfile>().is_err());
    }
}
