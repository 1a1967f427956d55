//! Types shared between the tower-duel server and its clients: the fixed unit
//! catalogs, player and phase tags, the line protocol and the snapshot frame.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod protocol;
pub mod snapshot;

pub use protocol::{parse_request, Command, LineBuffer, ProtocolError, Request, MAX_LINE_LEN};
pub use snapshot::{
    EnemyRecord, MoneyRecord, ObstacleRecord, Snapshot, SpawnerRecord, TowerRecord,
};

/// Reply sent to a connection after a successful `SUBSCRIBE`.
pub const SUBSCRIBED_REPLY: &str = "OK SUBSCRIBED";

/// One of the two seats on a side. Serialized as the integer `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player.id()
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Player::from_id(id).ok_or_else(|| format!("invalid player id {}", id))
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Top-level state of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Setup,
    Running,
    Gameover,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Phase::Setup => "SETUP",
            Phase::Running => "RUNNING",
            Phase::Gameover => "GAMEOVER",
        };
        f.write_str(tag)
    }
}

/// Side that won a finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    Towers,
    Enemies,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Towers => f.write_str("TOWERS"),
            Winner::Enemies => f.write_str("ENEMIES"),
        }
    }
}

/// Base combat and price figures for a tower kind at level 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerStats {
    pub range: u32,
    pub dmg: f32,
    pub fire_rate: f32,
    pub cost: u32,
    pub upgrade_cost: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerKind {
    Basic,
    Sniper,
    Rapid,
}

impl TowerKind {
    pub const ALL: [TowerKind; 3] = [TowerKind::Basic, TowerKind::Sniper, TowerKind::Rapid];

    pub fn stats(self) -> TowerStats {
        match self {
            TowerKind::Basic => TowerStats {
                range: 140,
                dmg: 12.0,
                fire_rate: 0.8,
                cost: 50,
                upgrade_cost: 40,
            },
            TowerKind::Sniper => TowerStats {
                range: 240,
                dmg: 30.0,
                fire_rate: 1.6,
                cost: 90,
                upgrade_cost: 80,
            },
            TowerKind::Rapid => TowerStats {
                range: 100,
                dmg: 6.0,
                fire_rate: 0.25,
                cost: 70,
                upgrade_cost: 60,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TowerKind::Basic => "basic",
            TowerKind::Sniper => "sniper",
            TowerKind::Rapid => "rapid",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TowerKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for TowerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    pub hp: f32,
    pub speed: f32,
    pub reward: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Basic,
    Fast,
    Armored,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 3] = [EnemyKind::Basic, EnemyKind::Fast, EnemyKind::Armored];

    pub fn stats(self) -> EnemyStats {
        match self {
            EnemyKind::Basic => EnemyStats {
                hp: 30.0,
                speed: 60.0,
                reward: 12,
            },
            EnemyKind::Fast => EnemyStats {
                hp: 18.0,
                speed: 110.0,
                reward: 10,
            },
            EnemyKind::Armored => EnemyStats {
                hp: 70.0,
                speed: 45.0,
                reward: 25,
            },
        }
    }

    /// Picks a kind from a uniform roll in `[0, 1)`: 65% basic, 25% fast,
    /// 10% armored.
    pub fn from_roll(roll: f64) -> Self {
        if roll < 0.65 {
            EnemyKind::Basic
        } else if roll < 0.9 {
            EnemyKind::Fast
        } else {
            EnemyKind::Armored
        }
    }
}

/// Splits a kill reward between the two tower players. Player 1 gets the
/// floor of half, player 2 the remainder.
pub fn split_reward(reward: u32) -> (u32, u32) {
    let first = reward / 2;
    (first, reward - first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_tower_catalog() {
        let basic = TowerKind::Basic.stats();
        assert_eq!(basic.range, 140);
        assert_approx_eq!(basic.dmg, 12.0);
        assert_approx_eq!(basic.fire_rate, 0.8);
        assert_eq!(basic.cost, 50);
        assert_eq!(basic.upgrade_cost, 40);

        let sniper = TowerKind::Sniper.stats();
        assert_eq!((sniper.range, sniper.cost, sniper.upgrade_cost), (240, 90, 80));
        assert_approx_eq!(sniper.dmg, 30.0);
        assert_approx_eq!(sniper.fire_rate, 1.6);

        let rapid = TowerKind::Rapid.stats();
        assert_eq!((rapid.range, rapid.cost, rapid.upgrade_cost), (100, 70, 60));
        assert_approx_eq!(rapid.dmg, 6.0);
        assert_approx_eq!(rapid.fire_rate, 0.25);
    }

    #[test]
    fn test_enemy_catalog() {
        assert_eq!(
            EnemyKind::Basic.stats(),
            EnemyStats { hp: 30.0, speed: 60.0, reward: 12 }
        );
        assert_eq!(
            EnemyKind::Fast.stats(),
            EnemyStats { hp: 18.0, speed: 110.0, reward: 10 }
        );
        assert_eq!(
            EnemyKind::Armored.stats(),
            EnemyStats { hp: 70.0, speed: 45.0, reward: 25 }
        );
    }

    #[test]
    fn test_enemy_roll_thresholds() {
        assert_eq!(EnemyKind::from_roll(0.0), EnemyKind::Basic);
        assert_eq!(EnemyKind::from_roll(0.6499), EnemyKind::Basic);
        assert_eq!(EnemyKind::from_roll(0.65), EnemyKind::Fast);
        assert_eq!(EnemyKind::from_roll(0.8999), EnemyKind::Fast);
        assert_eq!(EnemyKind::from_roll(0.9), EnemyKind::Armored);
        assert_eq!(EnemyKind::from_roll(0.9999), EnemyKind::Armored);
    }

    #[test]
    fn test_reward_split_conserves_total() {
        for kind in EnemyKind::ALL {
            let reward = kind.stats().reward;
            let (first, second) = split_reward(reward);
            assert_eq!(first + second, reward);
            assert_eq!(first, reward / 2);
        }
        assert_eq!(split_reward(25), (12, 13));
    }

    #[test]
    fn test_tower_kind_names() {
        for kind in TowerKind::ALL {
            assert_eq!(TowerKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(TowerKind::from_name("laser"), None);
        assert_eq!(TowerKind::from_name("Basic"), None);
    }

    #[test]
    fn test_player_ids() {
        assert_eq!(Player::from_id(1), Some(Player::One));
        assert_eq!(Player::from_id(2), Some(Player::Two));
        assert_eq!(Player::from_id(0), None);
        assert_eq!(Player::from_id(3), None);
        assert_eq!(Player::Two.id(), 2);
        assert_eq!(serde_json::to_string(&Player::One).unwrap(), "1");
        assert!(serde_json::from_str::<Player>("7").is_err());
    }

    #[test]
    fn test_phase_and_winner_tags() {
        assert_eq!(serde_json::to_string(&Phase::Gameover).unwrap(), "\"GAMEOVER\"");
        assert_eq!(Phase::Setup.to_string(), "SETUP");
        assert_eq!(serde_json::to_string(&Winner::Enemies).unwrap(), "\"ENEMIES\"");
        assert_eq!(Winner::Towers.to_string(), "TOWERS");
    }
}
