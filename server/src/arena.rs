//! Fixed arena geometry and the per-round obstacle layout.

use crate::geometry::Vec2;
use log::debug;
use rand::Rng;
use shared::ObstacleRecord;

pub const WIDTH: i32 = 1000;
pub const HEIGHT: i32 = 640;
pub const BASE_POS: Vec2 = Vec2::new((WIDTH - 60) as f32, (HEIGHT / 2) as f32);
pub const BASE_RADIUS: f32 = 36.0;

/// Extra distance beyond the base radius inside which nothing may be built.
pub const BASE_CLEARANCE: f32 = 40.0;
pub const TOWER_RADIUS: f32 = 16.0;
/// Slack around a tower's radius when picking it for an upgrade.
pub const UPGRADE_PICK_SLACK: f32 = 16.0;
pub const SPAWNER_SPACING: f32 = 28.0;

pub const MAX_TOWERS_PER_PLAYER: u32 = 8;
pub const MAX_SPAWNERS_PER_PLAYER: u32 = 4;
pub const SPAWN_INTERVAL: f32 = 3.5;

pub const PATH_GRID_SIZE: i32 = 24;
pub const OBSTACLE_COUNT: usize = 12;
const OBSTACLE_MARGIN: i32 = 120;
const OBSTACLE_ATTEMPTS: usize = OBSTACLE_COUNT * 4;

/// Axis-aligned rectangle in integer arena units. Covers `[x, x + w)` by
/// `[y, y + h)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// True when the interiors overlap; touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn to_record(&self) -> ObstacleRecord {
        ObstacleRecord {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }
}

/// Square around the base that obstacles must stay clear of.
pub fn base_keepout() -> Rect {
    let reach = (BASE_RADIUS + BASE_CLEARANCE) as i32;
    Rect::new(
        BASE_POS.x as i32 - reach,
        BASE_POS.y as i32 - reach,
        reach * 2,
        reach * 2,
    )
}

/// True when `point` is too close to the base to build on. The boundary
/// itself is buildable.
pub fn within_base_clearance(point: &Vec2) -> bool {
    point.distance(&BASE_POS) < BASE_RADIUS + BASE_CLEARANCE
}

/// Rolls a fresh obstacle layout. Gives up after a bounded number of
/// attempts, so a layout may hold fewer than `OBSTACLE_COUNT` rectangles.
pub fn generate_obstacles<R: Rng>(rng: &mut R) -> Vec<Rect> {
    let keepout = base_keepout();
    let mut obstacles = Vec::with_capacity(OBSTACLE_COUNT);
    let mut attempts = 0;

    while obstacles.len() < OBSTACLE_COUNT && attempts < OBSTACLE_ATTEMPTS {
        attempts += 1;
        let w = rng.gen_range(40..=140);
        let h = rng.gen_range(24..=80);
        let x = rng.gen_range(OBSTACLE_MARGIN..=WIDTH - OBSTACLE_MARGIN - w);
        let y = rng.gen_range(40..=HEIGHT - 40 - h);
        let rect = Rect::new(x, y, w, h);

        if rect.intersects(&keepout) {
            continue;
        }
        obstacles.push(rect);
    }

    debug!(
        "Generated {} obstacles in {} attempts",
        obstacles.len(),
        attempts
    );
    obstacles
}
