//! One-line text summary of a snapshot frame.

use shared::{Player, Snapshot, Winner};

/// Formats seconds as `MM:SS`, truncating fractions. Negative input shows
/// as `00:00`.
pub fn format_time(seconds: f32) -> String {
    // NaN fails the comparison and lands on zero as well
    let total = if seconds > 0.0 { seconds as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn hud_line(snapshot: &Snapshot) -> String {
    let mut line = format!(
        "[{}] {}  P1 ${}  P2 ${}  towers {}  spawners {}  enemies {}",
        snapshot.phase,
        format_time(snapshot.time_left),
        snapshot.money.get(Player::One),
        snapshot.money.get(Player::Two),
        snapshot.towers.len(),
        snapshot.spawners.len(),
        snapshot.enemies.len(),
    );
    match snapshot.winner {
        Some(Winner::Towers) => line.push_str("  TOWERS WIN!"),
        Some(Winner::Enemies) => line.push_str("  ENEMIES WIN!"),
        None => {}
    }
    line
}

/// Remembers the last HUD line so repeated frames are not reprinted.
#[derive(Debug, Default)]
pub struct HudTracker {
    last: Option<String>,
}

impl HudTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the HUD line for `snapshot` if it differs from the last one.
    pub fn update(&mut self, snapshot: &Snapshot) -> Option<String> {
        let line = hud_line(snapshot);
        if self.last.as_deref() == Some(line.as_str()) {
            return None;
        }
        self.last = Some(line.clone());
        Some(line)
    }
}
