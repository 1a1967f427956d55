//! Authoritative round state and the rules that mutate it.
//!
//! `GameState` exclusively owns every entity collection, both money
//! balances and the phase. Nothing outside this module mutates an entity;
//! callers hand in `Command`s and read snapshots.

use crate::arena::{
    self, Rect, BASE_POS, BASE_RADIUS, HEIGHT, MAX_SPAWNERS_PER_PLAYER, MAX_TOWERS_PER_PLAYER,
    PATH_GRID_SIZE, SPAWNER_SPACING, TOWER_RADIUS, UPGRADE_PICK_SLACK, WIDTH,
};
use crate::entity::{Enemy, Spawner, Tower};
use crate::geometry::Vec2;
use crate::pathfinding::Pathfinder;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{split_reward, Command, MoneyRecord, Phase, Player, Snapshot, TowerKind, Winner};

/// Parameters fixed for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSettings {
    /// Round length in seconds.
    pub round_time: f32,
    pub starting_money: u32,
    /// Seed for obstacle layouts and spawn rolls. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            round_time: 180.0,
            starting_money: 200,
            seed: None,
        }
    }
}

/// A value held separately for each player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerPlayer<T> {
    one: T,
    two: T,
}

impl<T: Copy> PerPlayer<T> {
    pub fn splat(value: T) -> Self {
        Self {
            one: value,
            two: value,
        }
    }

    pub fn get(&self, player: Player) -> T {
        match player {
            Player::One => self.one,
            Player::Two => self.two,
        }
    }

    pub fn get_mut(&mut self, player: Player) -> &mut T {
        match player {
            Player::One => &mut self.one,
            Player::Two => &mut self.two,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameState {
    settings: RoundSettings,
    rng: StdRng,

    phase: Phase,
    winner: Option<Winner>,
    time_left: f32,
    gameover_elapsed: f32,
    tick: u64,

    towers: Vec<Tower>,
    spawners: Vec<Spawner>,
    enemies: Vec<Enemy>,
    tower_counts: PerPlayer<u32>,
    spawner_counts: PerPlayer<u32>,
    money: PerPlayer<u32>,

    obstacles: Vec<Rect>,
    pathfinder: Pathfinder,
}

impl GameState {
    pub fn new(settings: RoundSettings) -> Self {
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let obstacles = arena::generate_obstacles(&mut rng);
        let pathfinder = Pathfinder::from_obstacles(WIDTH, HEIGHT, PATH_GRID_SIZE, &obstacles);

        Self {
            time_left: settings.round_time,
            money: PerPlayer::splat(settings.starting_money),
            settings,
            rng,
            phase: Phase::Setup,
            winner: None,
            gameover_elapsed: 0.0,
            tick: 0,
            towers: Vec::new(),
            spawners: Vec::new(),
            enemies: Vec::new(),
            tower_counts: PerPlayer::default(),
            spawner_counts: PerPlayer::default(),
            obstacles,
            pathfinder,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn gameover_elapsed(&self) -> f32 {
        self.gameover_elapsed
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn settings(&self) -> &RoundSettings {
        &self.settings
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    pub fn money(&self, player: Player) -> u32 {
        self.money.get(player)
    }

    /// One simulation tick: apply the drained commands in order, then
    /// advance the world by `dt` seconds.
    pub fn step(&mut self, commands: Vec<Command>, dt: f32) {
        for command in commands {
            self.apply_command(command);
        }
        self.update(dt);
        self.tick += 1;
    }

    /// Validates and applies one intent. Returns false when a game rule
    /// rejected it; rejections leave the state untouched.
    pub fn apply_command(&mut self, command: Command) -> bool {
        let applied = match command {
            Command::BuyTower { owner, x, y, kind } => self.try_buy_tower(owner, x, y, kind),
            Command::PlaceSpawner { owner, x, y } => self.try_place_spawner(owner, x, y),
            Command::UpgradeTower { x, y } => self.try_upgrade_tower_at(Vec2::new(x as f32, y as f32)),
            Command::Start => self.start_round(),
            Command::Reset => {
                self.reset();
                true
            }
        };

        if !applied {
            debug!("Rejected command: {}", command);
        }
        applied
    }

    pub fn try_buy_tower(&mut self, owner: Player, x: i32, y: i32, kind: TowerKind) -> bool {
        let pos = Vec2::new(x as f32, y as f32);
        if arena::within_base_clearance(&pos) {
            return false;
        }
        if self.tower_counts.get(owner) >= MAX_TOWERS_PER_PLAYER {
            return false;
        }
        let cost = kind.stats().cost;
        if self.money.get(owner) < cost {
            return false;
        }
        if self
            .towers
            .iter()
            .any(|tower| tower.pos.distance(&pos) < TOWER_RADIUS * 2.0)
        {
            return false;
        }

        self.towers.push(Tower::new(x, y, owner, kind));
        *self.tower_counts.get_mut(owner) += 1;
        *self.money.get_mut(owner) -= cost;
        info!(
            "Player {} bought {} tower at ({}, {})",
            owner, kind, x, y
        );
        true
    }

    pub fn try_place_spawner(&mut self, owner: Player, x: i32, y: i32) -> bool {
        let pos = Vec2::new(x as f32, y as f32);
        if arena::within_base_clearance(&pos) {
            return false;
        }
        if self.spawner_counts.get(owner) >= MAX_SPAWNERS_PER_PLAYER {
            return false;
        }
        if self
            .spawners
            .iter()
            .any(|spawner| spawner.pos.distance(&pos) < SPAWNER_SPACING)
        {
            return false;
        }

        let initial_timer = self.rng.gen_range(0.0..2.0);
        self.spawners.push(Spawner::new(x, y, owner, initial_timer));
        *self.spawner_counts.get_mut(owner) += 1;
        info!("Player {} placed spawner at ({}, {})", owner, x, y);
        true
    }

    /// Upgrades the tower nearest to `pos`, if one is close enough to be
    /// picked and its owner can pay `upgrade_cost * level`.
    pub fn try_upgrade_tower_at(&mut self, pos: Vec2) -> bool {
        let mut nearest: Option<(usize, f32)> = None;
        for (index, tower) in self.towers.iter().enumerate() {
            let distance = tower.pos.distance(&pos);
            if distance <= TOWER_RADIUS + UPGRADE_PICK_SLACK
                && nearest.map_or(true, |(_, best)| distance < best)
            {
                nearest = Some((index, distance));
            }
        }

        let Some((index, _)) = nearest else {
            return false;
        };
        let tower = &mut self.towers[index];
        let cost = tower.upgrade_cost();
        let balance = self.money.get_mut(tower.owner);
        if *balance < cost {
            return false;
        }

        *balance -= cost;
        tower.upgrade();
        info!(
            "Upgraded tower at ({}, {}) for player {} to level {}",
            tower.x, tower.y, tower.owner, tower.level
        );
        true
    }

    /// Moves SETUP to RUNNING, seeding one spawner per side if nobody placed
    /// any. No-op in any other phase.
    pub fn start_round(&mut self) -> bool {
        if self.phase != Phase::Setup {
            return false;
        }

        if self.spawners.is_empty() {
            self.spawners
                .push(Spawner::new(40, HEIGHT / 3, Player::One, 0.5));
            self.spawners
                .push(Spawner::new(40, HEIGHT * 2 / 3, Player::Two, 1.0));
            for player in Player::ALL {
                *self.spawner_counts.get_mut(player) += 1;
            }
        }

        self.phase = Phase::Running;
        self.time_left = self.time_left.max(1.0);
        info!("Round started with {:.0}s on the clock", self.time_left);
        true
    }

    /// Back to SETUP with fresh collections, money and obstacle layout. Only
    /// the configured settings survive.
    pub fn reset(&mut self) {
        let settings = self.settings.clone();
        let obstacles = arena::generate_obstacles(&mut self.rng);

        self.pathfinder = Pathfinder::from_obstacles(WIDTH, HEIGHT, PATH_GRID_SIZE, &obstacles);
        self.obstacles = obstacles;
        self.phase = Phase::Setup;
        self.winner = None;
        self.time_left = settings.round_time;
        self.gameover_elapsed = 0.0;
        self.towers.clear();
        self.spawners.clear();
        self.enemies.clear();
        self.tower_counts = PerPlayer::default();
        self.spawner_counts = PerPlayer::default();
        self.money = PerPlayer::splat(settings.starting_money);
        info!("Game reset");
    }

    /// Advances the world by `dt` seconds without touching the command queue.
    pub fn update(&mut self, dt: f32) {
        match self.phase {
            Phase::Setup => {}
            Phase::Running => self.update_running(dt),
            Phase::Gameover => self.gameover_elapsed += dt,
        }
    }

    fn update_running(&mut self, dt: f32) {
        for spawner in &mut self.spawners {
            spawner.update(dt, &mut self.rng, &mut self.enemies, &self.pathfinder);
        }
        for enemy in &mut self.enemies {
            enemy.update(dt);
        }
        self.collect_kills();
        for tower in &mut self.towers {
            tower.update(dt, &mut self.enemies);
        }

        if self
            .enemies
            .iter()
            .any(|enemy| enemy.pos.distance(&BASE_POS) <= BASE_RADIUS)
        {
            self.finish(Winner::Enemies);
            info!("Enemies win: the base was infiltrated");
            return;
        }

        self.time_left -= dt;
        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            self.finish(Winner::Towers);
            info!("Towers win: the timer ran out");
        }
    }

    /// Removes dead enemies and pays out their rewards.
    fn collect_kills(&mut self) {
        let money = &mut self.money;
        self.enemies.retain(|enemy| {
            if !enemy.is_dead() {
                return true;
            }
            let (first, second) = split_reward(enemy.reward());
            *money.get_mut(Player::One) += first;
            *money.get_mut(Player::Two) += second;
            false
        });
    }

    fn finish(&mut self, winner: Winner) {
        self.phase = Phase::Gameover;
        self.winner = Some(winner);
        self.gameover_elapsed = 0.0;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            time_left: self.time_left,
            towers: self.towers.iter().map(Tower::to_record).collect(),
            spawners: self.spawners.iter().map(Spawner::to_record).collect(),
            enemies: self.enemies.iter().map(Enemy::to_record).collect(),
            money: MoneyRecord {
                one: self.money.get(Player::One),
                two: self.money.get(Player::Two),
            },
            obstacles: self.obstacles.iter().map(Rect::to_record).collect(),
            winner: self.winner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::EnemyKind;

    fn settings(round_time: f32) -> RoundSettings {
        RoundSettings {
            round_time,
            starting_money: 200,
            seed: Some(42),
        }
    }

    fn new_state() -> GameState {
        GameState::new(settings(180.0))
    }

    /// A running round with no enemy production, so tests control every enemy.
    fn running_state() -> GameState {
        let mut state = new_state();
        assert!(state.start_round());
        state.spawners.clear();
        state
    }

    fn buy(state: &mut GameState, owner: Player, x: i32, y: i32, kind: TowerKind) -> bool {
        state.apply_command(Command::BuyTower { owner, x, y, kind })
    }

    #[test]
    fn test_new_state() {
        let state = new_state();
        assert_eq!(state.phase(), Phase::Setup);
        assert_eq!(state.winner(), None);
        assert_approx_eq!(state.time_left(), 180.0);
        assert_eq!(state.money(Player::One), 200);
        assert_eq!(state.money(Player::Two), 200);
        assert!(state.towers().is_empty());
        assert!(state.spawners().is_empty());
        assert!(state.enemies().is_empty());
        assert!(!state.obstacles().is_empty());
    }

    #[test]
    fn test_buy_tower_debits_owner() {
        let mut state = new_state();
        assert!(buy(&mut state, Player::Two, 300, 100, TowerKind::Sniper));
        assert_eq!(state.money(Player::Two), 110);
        assert_eq!(state.money(Player::One), 200);
        assert_eq!(state.towers().len(), 1);
        assert_eq!(state.towers()[0].owner, Player::Two);
    }

    #[test]
    fn test_buy_rejection_boundary_near_base() {
        let mut state = new_state();
        // Exactly base_radius + 40 away: accepted.
        assert!(buy(&mut state, Player::One, 940 - 76, 320, TowerKind::Basic));
        // One unit closer: rejected.
        let money_before = state.money(Player::Two);
        assert!(!buy(&mut state, Player::Two, 940, 320 - 75, TowerKind::Basic));
        assert_eq!(state.money(Player::Two), money_before);
        assert_eq!(state.towers().len(), 1);
    }

    #[test]
    fn test_buy_rejects_stacking() {
        let mut state = new_state();
        assert!(buy(&mut state, Player::One, 300, 300, TowerKind::Basic));
        assert!(!buy(&mut state, Player::Two, 331, 300, TowerKind::Basic));
        assert!(buy(&mut state, Player::Two, 332, 300, TowerKind::Basic));
        assert_eq!(state.money(Player::Two), 150);
    }

    #[test]
    fn test_buy_rejects_insufficient_funds() {
        let mut state = new_state();
        assert!(buy(&mut state, Player::One, 100, 100, TowerKind::Sniper));
        assert!(buy(&mut state, Player::One, 200, 100, TowerKind::Sniper));
        assert_eq!(state.money(Player::One), 20);
        assert!(!buy(&mut state, Player::One, 300, 100, TowerKind::Basic));
        assert_eq!(state.towers().len(), 2);
        assert_eq!(state.money(Player::One), 20);
    }

    #[test]
    fn test_tower_cap() {
        let mut state = new_state();
        state.money = PerPlayer::splat(10_000);
        for i in 0..MAX_TOWERS_PER_PLAYER as i32 {
            assert!(buy(&mut state, Player::One, 100 + i * 50, 100, TowerKind::Basic));
        }
        let money_before = state.money(Player::One);
        assert!(!buy(&mut state, Player::One, 100, 500, TowerKind::Basic));
        assert_eq!(state.towers().len(), 8);
        assert_eq!(state.money(Player::One), money_before);

        // The other player is unaffected by player one's cap.
        assert!(buy(&mut state, Player::Two, 100, 500, TowerKind::Basic));
    }

    #[test]
    fn test_spawner_placement_rules() {
        let mut state = new_state();
        let place = |state: &mut GameState, owner, x, y| {
            state.apply_command(Command::PlaceSpawner { owner, x, y })
        };

        assert!(!place(&mut state, Player::One, 900, 320));
        assert!(place(&mut state, Player::One, 40, 100));
        assert!(!place(&mut state, Player::Two, 40, 127));
        assert!(place(&mut state, Player::Two, 40, 128));
        for y in [200, 300, 400] {
            assert!(place(&mut state, Player::One, 40, y));
        }
        // Player one is at the cap of four.
        assert!(!place(&mut state, Player::One, 40, 500));
        assert_eq!(state.spawners().len(), 5);
        for spawner in state.spawners() {
            assert!(spawner.spawn_timer >= 0.0 && spawner.spawn_timer < 2.0);
        }
        // Placement costs nothing.
        assert_eq!(state.money(Player::One), 200);
    }

    #[test]
    fn test_upgrade_nearest_tower_and_cost_scaling() {
        let mut state = new_state();
        assert!(buy(&mut state, Player::One, 300, 300, TowerKind::Basic));
        assert!(buy(&mut state, Player::Two, 340, 300, TowerKind::Basic));

        // Closer to the second tower.
        assert!(state.apply_command(Command::UpgradeTower { x: 325, y: 300 }));
        assert_eq!(state.towers()[1].level, 2);
        assert_eq!(state.towers()[0].level, 1);
        assert_eq!(state.money(Player::Two), 150 - 40);

        // Level 2 costs 80.
        assert!(state.apply_command(Command::UpgradeTower { x: 340, y: 300 }));
        assert_eq!(state.money(Player::Two), 110 - 80);
        assert_eq!(state.towers()[1].level, 3);

        // Level 3 costs 120; only 30 left.
        assert!(!state.apply_command(Command::UpgradeTower { x: 340, y: 300 }));
        assert_eq!(state.towers()[1].level, 3);
        assert_eq!(state.money(Player::Two), 30);
    }

    #[test]
    fn test_upgrade_requires_nearby_tower() {
        let mut state = new_state();
        assert!(buy(&mut state, Player::One, 300, 300, TowerKind::Rapid));
        assert!(!state.apply_command(Command::UpgradeTower { x: 333, y: 300 }));
        assert!(state.apply_command(Command::UpgradeTower { x: 332, y: 300 }));
        assert_eq!(state.money(Player::One), 200 - 70 - 60);
    }

    #[test]
    fn test_start_seeds_default_spawners() {
        let mut state = new_state();
        assert!(state.apply_command(Command::Start));
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.spawners().len(), 2);
        assert_eq!(state.spawners()[0].pos, Vec2::new(40.0, 213.0));
        assert_eq!(state.spawners()[0].owner, Player::One);
        assert_eq!(state.spawners()[1].pos, Vec2::new(40.0, 426.0));
        assert_eq!(state.spawners()[1].owner, Player::Two);

        // A second start is a no-op.
        assert!(!state.apply_command(Command::Start));
        assert_eq!(state.spawners().len(), 2);
    }

    #[test]
    fn test_start_keeps_placed_spawners() {
        let mut state = new_state();
        assert!(state.apply_command(Command::PlaceSpawner {
            owner: Player::Two,
            x: 60,
            y: 60,
        }));
        assert!(state.start_round());
        assert_eq!(state.spawners().len(), 1);
    }

    #[test]
    fn test_setup_does_not_simulate() {
        let mut state = new_state();
        state.enemies.push(Enemy::new(EnemyKind::Basic, Vec2::new(100.0, 100.0)));
        state.step(Vec::new(), 1.0);
        assert_eq!(state.enemies()[0].pos, Vec2::new(100.0, 100.0));
        assert_approx_eq!(state.time_left(), 180.0);
        assert_eq!(state.tick(), 1);
    }

    #[test]
    fn test_kill_reward_split() {
        let mut state = running_state();
        for kind in EnemyKind::ALL {
            let mut enemy = Enemy::new(kind, Vec2::new(100.0, 100.0));
            enemy.hp = 0.0;
            state.enemies.push(enemy);
        }

        state.update(0.01);
        assert!(state.enemies().is_empty());
        // Rewards 12, 10, 25: player one gets 6 + 5 + 12, player two 6 + 5 + 13.
        assert_eq!(state.money(Player::One), 200 + 23);
        assert_eq!(state.money(Player::Two), 200 + 24);
    }

    #[test]
    fn test_tower_kill_pays_on_following_tick() {
        let mut state = running_state();
        assert!(buy(&mut state, Player::One, 300, 300, TowerKind::Sniper));
        let mut enemy = Enemy::new(EnemyKind::Fast, Vec2::new(320.0, 300.0));
        enemy.hp = 10.0;
        state.enemies.push(enemy);

        state.update(0.01);
        assert_eq!(state.enemies().len(), 1);
        assert!(state.enemies()[0].is_dead());
        assert_eq!(state.money(Player::One), 110);

        state.update(0.01);
        assert!(state.enemies().is_empty());
        assert_eq!(state.money(Player::One), 115);
        assert_eq!(state.money(Player::Two), 205);
    }

    #[test]
    fn test_round_ends_on_timeout() {
        let mut state = GameState::new(settings(1.0));
        assert!(state.start_round());
        state.spawners.clear();

        for _ in 0..25 {
            state.step(Vec::new(), 0.05);
        }
        assert_eq!(state.phase(), Phase::Gameover);
        assert_eq!(state.winner(), Some(Winner::Towers));
        assert_approx_eq!(state.time_left(), 0.0);
    }

    #[test]
    fn test_start_clamps_time_budget() {
        let mut state = GameState::new(settings(0.25));
        assert!(state.start_round());
        assert_approx_eq!(state.time_left(), 1.0);
    }

    #[test]
    fn test_infiltration_ends_round_immediately() {
        let mut state = running_state();
        state
            .enemies
            .push(Enemy::new(EnemyKind::Armored, Vec2::new(BASE_POS.x - 30.0, BASE_POS.y)));

        state.step(Vec::new(), 0.01);
        assert_eq!(state.phase(), Phase::Gameover);
        assert_eq!(state.winner(), Some(Winner::Enemies));
        // The timer is not decremented on the infiltration tick.
        assert_approx_eq!(state.time_left(), 180.0);
    }

    #[test]
    fn test_gameover_only_advances_elapsed_counter() {
        let mut state = running_state();
        state
            .enemies
            .push(Enemy::new(EnemyKind::Basic, BASE_POS));
        state.update(0.01);
        assert_eq!(state.phase(), Phase::Gameover);

        let position = state.enemies()[0].pos;
        state.update(0.5);
        state.update(0.25);
        assert_approx_eq!(state.gameover_elapsed(), 0.75);
        assert_eq!(state.enemies()[0].pos, position);
        assert_eq!(state.winner(), Some(Winner::Enemies));
        assert!(!state.start_round());
    }

    #[test]
    fn test_reset_restores_setup() {
        let mut state = running_state();
        assert!(buy(&mut state, Player::One, 300, 300, TowerKind::Basic));
        state
            .enemies
            .push(Enemy::new(EnemyKind::Basic, BASE_POS));
        state.update(0.01);
        assert_eq!(state.phase(), Phase::Gameover);

        assert!(state.apply_command(Command::Reset));
        assert_eq!(state.phase(), Phase::Setup);
        assert_eq!(state.winner(), None);
        assert!(state.towers().is_empty());
        assert!(state.spawners().is_empty());
        assert!(state.enemies().is_empty());
        assert_eq!(state.money(Player::One), 200);
        assert_eq!(state.money(Player::Two), 200);
        assert_approx_eq!(state.time_left(), 180.0);
        assert_approx_eq!(state.gameover_elapsed(), 0.0);

        // Caps start over too.
        for y in [100, 200, 300, 400] {
            assert!(state.try_place_spawner(Player::One, 40, y));
        }
    }

    #[test]
    fn test_reset_regenerates_obstacle_grid() {
        let mut state = new_state();
        state.reset();
        let rebuilt =
            Pathfinder::from_obstacles(WIDTH, HEIGHT, PATH_GRID_SIZE, state.obstacles());
        let (cols, rows) = rebuilt.dimensions();
        for col in 0..cols {
            for row in 0..rows {
                let cell = crate::pathfinding::Cell::new(col, row);
                assert_eq!(state.pathfinder().is_blocked(cell), rebuilt.is_blocked(cell));
            }
        }
    }

    #[test]
    fn test_commands_apply_in_order() {
        let mut state = new_state();
        let commands = vec![
            Command::BuyTower {
                owner: Player::One,
                x: 300,
                y: 300,
                kind: TowerKind::Basic,
            },
            Command::UpgradeTower { x: 300, y: 300 },
            Command::Start,
        ];
        state.step(commands, 0.0);
        assert_eq!(state.towers()[0].level, 2);
        assert_eq!(state.money(Player::One), 110);
        assert_eq!(state.phase(), Phase::Running);

        // Reversed, the upgrade finds nothing to upgrade.
        let mut state = new_state();
        let commands = vec![
            Command::UpgradeTower { x: 300, y: 300 },
            Command::BuyTower {
                owner: Player::One,
                x: 300,
                y: 300,
                kind: TowerKind::Basic,
            },
        ];
        state.step(commands, 0.0);
        assert_eq!(state.towers()[0].level, 1);
        assert_eq!(state.money(Player::One), 150);
    }

    #[test]
    fn test_running_round_produces_routed_enemies() {
        let mut state = new_state();
        assert!(state.start_round());
        for _ in 0..60 {
            state.step(Vec::new(), 1.0 / 60.0);
        }
        assert!(!state.enemies().is_empty());
        for enemy in state.enemies() {
            assert!(!enemy.path.is_empty());
        }
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut state = new_state();
        assert!(buy(&mut state, Player::Two, 300, 120, TowerKind::Rapid));
        assert!(state.start_round());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, Phase::Running);
        assert_eq!(snapshot.towers.len(), 1);
        assert_eq!(snapshot.towers[0].ttype, TowerKind::Rapid);
        assert_eq!((snapshot.towers[0].x, snapshot.towers[0].y), (300, 120));
        assert_eq!(snapshot.spawners.len(), 2);
        assert_eq!(snapshot.money.get(Player::Two), 130);
        assert_eq!(snapshot.obstacles.len(), state.obstacles().len());
        assert_eq!(snapshot.winner, None);

        let value: serde_json::Value =
            serde_json::from_str(&snapshot.to_frame().unwrap()).unwrap();
        assert_eq!(value["enemies"], serde_json::Value::Array(vec![]));
        assert_eq!(value["winner"], "");
    }

    #[test]
    fn test_snapshot_reports_requested_coordinates() {
        let mut state = new_state();
        assert!(buy(&mut state, Player::One, 16_777_217, 0, TowerKind::Basic));
        assert!(state.apply_command(Command::PlaceSpawner {
            owner: Player::Two,
            x: 40,
            y: -16_777_219,
        }));

        let snapshot = state.snapshot();
        assert_eq!((snapshot.towers[0].x, snapshot.towers[0].y), (16_777_217, 0));
        assert_eq!(
            (snapshot.spawners[0].x, snapshot.spawners[0].y),
            (40, -16_777_219)
        );
    }
}
