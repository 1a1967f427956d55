//! Towers, spawners and enemies, with their per-tick behaviour.

use crate::arena::{BASE_POS, SPAWN_INTERVAL};
use crate::geometry::Vec2;
use crate::pathfinding::Pathfinder;
use log::debug;
use rand::Rng;
use shared::{EnemyKind, EnemyRecord, Player, SpawnerRecord, TowerKind, TowerRecord};

const DAMAGE_PER_LEVEL: f32 = 1.3;
const RANGE_PER_LEVEL: f64 = 1.15;
const FIRE_RATE_PER_LEVEL: f32 = 0.9;
const MIN_FIRE_RATE: f32 = 0.1;

/// Squared distance at which an enemy counts as having reached a waypoint.
const WAYPOINT_REACHED_SQ: f32 = 1.0;
const SPAWN_JITTER: f32 = 6.0;
const SPAWN_INTERVAL_JITTER: f32 = 0.6;
const MIN_SPAWN_INTERVAL: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct Enemy {
    pub pos: Vec2,
    pub hp: f32,
    pub speed: f32,
    pub kind: EnemyKind,
    pub path: Vec<Vec2>,
    pub path_index: usize,
}

impl Enemy {
    pub fn new(kind: EnemyKind, pos: Vec2) -> Self {
        let stats = kind.stats();
        Self {
            pos,
            hp: stats.hp,
            speed: stats.speed,
            kind,
            path: Vec::new(),
            path_index: 0,
        }
    }

    pub fn with_path(mut self, path: Vec<Vec2>) -> Self {
        self.path = path;
        self.path_index = 0;
        self
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }

    pub fn reward(&self) -> u32 {
        self.kind.stats().reward
    }

    /// Follows the path one waypoint at a time, then heads straight for the
    /// base. Reaching a waypoint only advances the cursor; the enemy starts
    /// moving toward the next waypoint on the following tick.
    ///
    /// Unlike a plain `pos += dir * speed * dt`, a step never carries past
    /// its target, so large deltas cannot make an enemy orbit a waypoint.
    pub fn update(&mut self, dt: f32) {
        let step = self.speed * dt;
        match self.path.get(self.path_index) {
            Some(target) => {
                if target.sub(&self.pos).length_squared() < WAYPOINT_REACHED_SQ {
                    self.path_index += 1;
                } else {
                    self.pos = self.pos.step_toward(target, step);
                }
            }
            None => {
                self.pos = self.pos.step_toward(&BASE_POS, step);
            }
        }
    }

    pub fn to_record(&self) -> EnemyRecord {
        EnemyRecord {
            x: self.pos.x,
            y: self.pos.y,
            hp: self.hp,
            etype: self.kind,
        }
    }
}

/// A defensive unit. Combat stats are always `kind` stats put through
/// `level - 1` upgrades.
#[derive(Debug, Clone)]
pub struct Tower {
    /// Placement point exactly as requested; `pos` is its float copy.
    pub x: i32,
    pub y: i32,
    pub pos: Vec2,
    pub owner: Player,
    pub kind: TowerKind,
    pub range: u32,
    pub dmg: f32,
    pub fire_rate: f32,
    pub cooldown: f32,
    pub level: u32,
}

impl Tower {
    pub fn new(x: i32, y: i32, owner: Player, kind: TowerKind) -> Self {
        let stats = kind.stats();
        Self {
            x,
            y,
            pos: Vec2::new(x as f32, y as f32),
            owner,
            kind,
            range: stats.range,
            dmg: stats.dmg,
            fire_rate: stats.fire_rate,
            cooldown: 0.0,
            level: 1,
        }
    }

    /// Price of the next upgrade, scaling linearly with the current level.
    pub fn upgrade_cost(&self) -> u32 {
        self.kind.stats().upgrade_cost * self.level
    }

    pub fn upgrade(&mut self) {
        self.level += 1;
        self.dmg *= DAMAGE_PER_LEVEL;
        self.range = (self.range as f64 * RANGE_PER_LEVEL).floor() as u32;
        self.fire_rate = (self.fire_rate * FIRE_RATE_PER_LEVEL).max(MIN_FIRE_RATE);
    }

    /// Counts down the cooldown and, once ready, hits the nearest enemy in
    /// range. Returns the index of the enemy that was hit.
    pub fn update(&mut self, dt: f32, enemies: &mut [Enemy]) -> Option<usize> {
        if self.cooldown > 0.0 {
            self.cooldown -= dt;
        }
        if self.cooldown > 0.0 {
            return None;
        }

        let range = self.range as f32;
        let mut target: Option<(usize, f32)> = None;
        for (index, enemy) in enemies.iter().enumerate() {
            let distance = self.pos.distance(&enemy.pos);
            if distance <= range && target.map_or(true, |(_, best)| distance < best) {
                target = Some((index, distance));
            }
        }

        let (index, _) = target?;
        enemies[index].hp -= self.dmg;
        self.cooldown = self.fire_rate;
        Some(index)
    }

    pub fn to_record(&self) -> TowerRecord {
        TowerRecord {
            x: self.x,
            y: self.y,
            owner: self.owner,
            ttype: self.kind,
            level: self.level,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spawner {
    pub x: i32,
    pub y: i32,
    pub pos: Vec2,
    pub owner: Player,
    pub spawn_timer: f32,
    pub spawn_interval: f32,
}

impl Spawner {
    pub fn new(x: i32, y: i32, owner: Player, spawn_timer: f32) -> Self {
        Self {
            x,
            y,
            pos: Vec2::new(x as f32, y as f32),
            owner,
            spawn_timer,
            spawn_interval: SPAWN_INTERVAL,
        }
    }

    /// Counts down and, on expiry, releases one enemy routed to the base.
    /// Returns true when an enemy was spawned.
    pub fn update<R: Rng>(
        &mut self,
        dt: f32,
        rng: &mut R,
        enemies: &mut Vec<Enemy>,
        pathfinder: &Pathfinder,
    ) -> bool {
        self.spawn_timer -= dt;
        if self.spawn_timer > 0.0 {
            return false;
        }

        let kind = EnemyKind::from_roll(rng.gen::<f64>());
        let pos = Vec2::new(
            self.pos.x + rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
            self.pos.y + rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
        );

        let mut enemy = Enemy::new(kind, pos);
        match pathfinder.find_path(&pos, &BASE_POS) {
            Some(path) => enemy = enemy.with_path(path),
            None => debug!("No path from ({:.0}, {:.0}); heading straight for base", pos.x, pos.y),
        }
        enemies.push(enemy);

        let jitter = rng.gen_range(-SPAWN_INTERVAL_JITTER..=SPAWN_INTERVAL_JITTER);
        self.spawn_timer = (self.spawn_interval + jitter).max(MIN_SPAWN_INTERVAL);
        true
    }

    pub fn to_record(&self) -> SpawnerRecord {
        SpawnerRecord {
            x: self.x,
            y: self.y,
            owner: self.owner,
        }
    }
}
