//! Per-level best-time records and their plain-text save files.
//!
//! File layout, one value per line, newline-terminated:
//!
//! ```text
//! <last lap seconds>
//! <best lap seconds>
//! <medal name: Gold | Silver | Bronze | empty>
//! <optional ghost: "<t> <x>,<y>:<rotation>;" repeated>
//! ```
//!
//! An empty time line means "no lap yet".

use crate::error::RecordError;
use crate::lap::{GhostSample, GhostTrack};
use macroquad::math::vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Lap-time reward tier, ordered worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Medal {
    /// No threshold beaten
    #[default]
    None,
    /// Beat the bronze time
    Bronze,
    /// Beat the silver time
    Silver,
    /// Beat the gold time
    Gold,
}

impl Medal {
    /// Save-file spelling; `None` is the empty string.
    pub fn name(self) -> &'static str {
        match self {
            Medal::None => "",
            Medal::Bronze => "Bronze",
            Medal::Silver => "Silver",
            Medal::Gold => "Gold",
        }
    }

    /// Inverse of [`Medal::name`].
    pub fn from_name(name: &str) -> Option<Medal> {
        match name {
            "" => Some(Medal::None),
            "Bronze" => Some(Medal::Bronze),
            "Silver" => Some(Medal::Silver),
            "Gold" => Some(Medal::Gold),
            _ => None,
        }
    }
}

/// Persisted lap state for one level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapRecord {
    /// Most recent valid lap, seconds
    pub last_lap: Option<f64>,
    /// Fastest valid lap, seconds
    pub best_lap: Option<f64>,
    /// Best tier reached
    pub medal: Medal,
    /// Trajectory of the best lap
    pub ghost: GhostTrack,
}

fn fmt_time(t: Option<f64>) -> String {
    t.map(|t| t.to_string()).unwrap_or_default()
}

fn parse_time(line: usize, raw: &str) -> Result<Option<f64>, RecordError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(t) if t.is_finite() && t >= 0.0 => Ok(Some(t)),
        _ => Err(RecordError::Malformed {
            line,
            message: format!("'{raw}' is not a lap time"),
        }),
    }
}

fn parse_ghost(line: usize, raw: &str) -> Result<GhostTrack, RecordError> {
    let bad = |what: &str| RecordError::Malformed {
        line,
        message: format!("bad ghost sample '{what}'"),
    };
    let mut samples = Vec::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (t, rest) = entry.split_once(' ').ok_or_else(|| bad(entry))?;
        let (xy, rot) = rest.trim().split_once(':').ok_or_else(|| bad(entry))?;
        let (x, y) = xy.split_once(',').ok_or_else(|| bad(entry))?;
        let num = |s: &str| s.trim().parse::<f32>().map_err(|_| bad(entry));
        samples.push(GhostSample {
            time: num(t)?,
            position: vec2(num(x)?, num(y)?),
            rotation: num(rot)?,
        });
    }
    Ok(GhostTrack::new(samples))
}

impl LapRecord {
    /// Render in save-file format.
    pub fn to_save_string(&self) -> String {
        let mut out = format!(
            "{}\n{}\n{}\n",
            fmt_time(self.last_lap),
            fmt_time(self.best_lap),
            self.medal.name()
        );
        if !self.ghost.is_empty() {
            for s in self.ghost.samples() {
                let _ = write!(out, "{} {},{}:{};", s.time, s.position.x, s.position.y, s.rotation);
            }
            out.push('\n');
        }
        out
    }

    /// Parse save-file text. Anything off-format is an error, never a default.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() < 3 {
            return Err(RecordError::Malformed {
                line: lines.len() + 1,
                message: "expected last lap, best lap and medal lines".into(),
            });
        }

        let last_lap = parse_time(1, lines[0])?;
        let best_lap = parse_time(2, lines[1])?;
        let medal = Medal::from_name(lines[2].trim()).ok_or_else(|| RecordError::Malformed {
            line: 3,
            message: format!("unknown medal '{}'", lines[2].trim()),
        })?;
        let ghost = match lines.get(3) {
            Some(raw) => parse_ghost(4, raw)?,
            None => GhostTrack::default(),
        };
        if let Some((i, _)) = lines.iter().enumerate().skip(4).find(|(_, l)| !l.trim().is_empty()) {
            return Err(RecordError::Malformed {
                line: i + 1,
                message: "unexpected trailing content".into(),
            });
        }

        Ok(Self {
            last_lap,
            best_lap,
            medal,
            ghost,
        })
    }
}

/// Where lap records live between sessions.
pub trait RecordStore {
    /// Stored record for `level`, or `None` on first run.
    fn load(&mut self, level: &str) -> Result<Option<LapRecord>, RecordError>;
    /// Replace the stored record for `level`.
    fn save(&mut self, level: &str, record: &LapRecord) -> Result<(), RecordError>;
}

/// `{level}-savefile.txt` files in one directory.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Save file path for `level`.
    pub fn path_for(&self, level: &str) -> PathBuf {
        self.dir.join(format!("{level}-savefile.txt"))
    }

    fn io_err(path: &Path) -> impl FnOnce(io::Error) -> RecordError + '_ {
        move |source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl RecordStore for FileRecordStore {
    fn load(&mut self, level: &str) -> Result<Option<LapRecord>, RecordError> {
        let path = self.path_for(level);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(level, "no save file; first run");
                return Ok(None);
            }
            Err(e) => return Err(Self::io_err(&path)(e)),
        };
        let record = LapRecord::parse(&text)?;
        info!(level, best = ?record.best_lap, medal = record.medal.name(), "record loaded");
        Ok(Some(record))
    }

    fn save(&mut self, level: &str, record: &LapRecord) -> Result<(), RecordError> {
        let path = self.path_for(level);
        std::fs::write(&path, record.to_save_string()).map_err(Self::io_err(&path))?;
        info!(level, path = %path.display(), "record saved");
        Ok(())
    }
}

/// In-memory store holding save-file text; can be told to fail writes.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    files: HashMap<String, String>,
    /// When set, every save returns an I/O error
    pub fail_saves: bool,
    /// Successful saves so far
    pub saves: usize,
}

impl MemoryRecordStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed raw save text for `level`.
    pub fn with_text(mut self, level: &str, text: impl Into<String>) -> Self {
        self.files.insert(level.to_owned(), text.into());
        self
    }

    /// Raw save text for `level`.
    pub fn text(&self, level: &str) -> Option<&str> {
        self.files.get(level).map(String::as_str)
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&mut self, level: &str) -> Result<Option<LapRecord>, RecordError> {
        self.files.get(level).map(|t| LapRecord::parse(t)).transpose()
    }

    fn save(&mut self, level: &str, record: &LapRecord) -> Result<(), RecordError> {
        if self.fail_saves {
            return Err(RecordError::Io {
                path: PathBuf::from(format!("{level}-savefile.txt")),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only store"),
            });
        }
        self.files.insert(level.to_owned(), record.to_save_string());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medal_names_and_order() {
        assert!(Medal::Gold > Medal::Silver && Medal::Silver > Medal::Bronze && Medal::Bronze > Medal::None);
        for m in [Medal::None, Medal::Bronze, Medal::Silver, Medal::Gold] {
            assert_eq!(Medal::from_name(m.name()), Some(m));
        }
        assert_eq!(Medal::from_name("Platinum"), None);
    }

    #[test]
    fn save_text_layout() {
        let record = LapRecord {
            last_lap: Some(12.34),
            best_lap: Some(11.0),
            medal: Medal::Silver,
            ghost: GhostTrack::default(),
        };
        assert_eq!(record.to_save_string(), "12.34\n11\nSilver\n");
        assert_eq!(LapRecord::parse("12.34\n11\nSilver\n").expect("parse"), record);
    }

    #[test]
    fn ghost_line_round_trips() {
        let text = "9.5\n9.5\nGold\n0 10,20:0.5;0.25 12.5,20:0.75;\n";
        let record = LapRecord::parse(text).expect("parse");
        assert_eq!(record.ghost.len(), 2);
        assert_eq!(record.ghost.samples()[1].position, vec2(12.5, 20.0));
        assert_eq!(record.to_save_string(), text);
    }

    #[test]
    fn empty_times_mean_no_lap_yet() {
        let record = LapRecord::parse("\n\n\n").expect("parse");
        assert_eq!(record, LapRecord::default());
    }

    #[test]
    fn malformed_files_fail_fast() {
        assert!(matches!(LapRecord::parse("1.0\n"), Err(RecordError::Malformed { line: 2, .. })));
        assert!(matches!(
            LapRecord::parse("abc\n1\nGold\n"),
            Err(RecordError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            LapRecord::parse("1\n1\nPlatinum\n"),
            Err(RecordError::Malformed { line: 3, .. })
        ));
        assert!(matches!(
            LapRecord::parse("1\n1\nGold\n0 1;\n"),
            Err(RecordError::Malformed { line: 4, .. })
        ));
    }

    #[test]
    fn first_bad_line_is_reported() {
        assert!(matches!(
            LapRecord::parse("fast\n\nNone\n"),
            Err(RecordError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            LapRecord::parse("1\nslow\nPlatinum\n"),
            Err(RecordError::Malformed { line: 2, .. })
        ));
    }

    #[test]
    fn memory_store_can_refuse_writes() {
        let mut store = MemoryRecordStore::new();
        store.fail_saves = true;
        assert!(store.save("oval", &LapRecord::default()).is_err());
        assert_eq!(store.load("oval").expect("load"), None);
    }
}
