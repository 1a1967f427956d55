//! Snapshot frames broadcast to subscribers, one JSON object per line.

use crate::{EnemyKind, Phase, Player, TowerKind, Winner};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerRecord {
    pub x: i32,
    pub y: i32,
    pub owner: Player,
    pub ttype: TowerKind,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerRecord {
    pub x: i32,
    pub y: i32,
    pub owner: Player,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyRecord {
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub etype: EnemyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleRecord {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// Money balances keyed by player id, `{"1": n, "2": n}` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyRecord {
    #[serde(rename = "1")]
    pub one: u32,
    #[serde(rename = "2")]
    pub two: u32,
}

impl MoneyRecord {
    pub fn get(&self, player: Player) -> u32 {
        match player {
            Player::One => self.one,
            Player::Two => self.two,
        }
    }
}

/// Complete state of the simulation at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub time_left: f32,
    pub towers: Vec<TowerRecord>,
    pub spawners: Vec<SpawnerRecord>,
    pub enemies: Vec<EnemyRecord>,
    pub money: MoneyRecord,
    pub obstacles: Vec<ObstacleRecord>,
    #[serde(with = "winner_tag")]
    pub winner: Option<Winner>,
}

impl Snapshot {
    /// Encodes the snapshot as a single newline-terminated JSON line.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        let mut frame = serde_json::to_string(self)?;
        frame.push('\n');
        Ok(frame)
    }

    pub fn from_frame(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }
}

/// Encodes "no winner yet" as the empty string.
mod winner_tag {
    use crate::Winner;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(winner: &Option<Winner>, serializer: S) -> Result<S::Ok, S::Error> {
        match winner {
            Some(Winner::Towers) => serializer.serialize_str("TOWERS"),
            Some(Winner::Enemies) => serializer.serialize_str("ENEMIES"),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Winner>, D::Error> {
        let tag = String::deserialize(deserializer)?;
        match tag.as_str() {
            "" => Ok(None),
            "TOWERS" => Ok(Some(Winner::Towers)),
            "ENEMIES" => Ok(Some(Winner::Enemies)),
            other => Err(D::Error::custom(format!("unknown winner tag '{}'", other))),
        }
    }
}
