//! # Simulation モジュール
//!
//! ユニット戦闘シミュレーションの中核となるシミュレーションエンジンを提供します。
//!
//! 固定時間刻み（ミリ秒）で時間を進め、スポナー、前方検知のポーリング、
//! 状態遷移、攻撃イベント、移動をすべて単一スレッドで順に処理します。
//! 時間は整数ミリ秒で管理するため、周期イベントの発火回数は累積誤差の影響を受けません。
//!
//! ## シミュレーション処理順序
//!
//! 各時間刻みにおいて、以下の順序で処理が実行されます：
//!
//! 1. **タイマー処理**: スポナーの準備完了、死亡ユニットの除去
//! 2. **ポーリング処理**: 前方検知、障害物分類、遷移条件フラグの更新
//! 3. **状態遷移**: 遷移表に従った状態の切り替え
//! 4. **攻撃処理**: 攻撃イベントごとの再検知とダメージ適用
//! 5. **移動処理**: 歩行状態のユニットを前進
//!
//! ## 使用例
//!
//! ```rust,ignore
//! let config = ScenarioConfig::from_file("scenarios/skirmish.yaml")?;
//!
//! let mut engine = SimulationEngine::new(config, 1);
//! engine.initialize()?;
//! let report = engine.run()?;
//! report.print();
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, trace};

use crate::models::{
    AttackOutcome, CollisionWorld, DamageOutcome, DetectionResult, Faction, IManaged, ObstacleDetector,
    ObstacleType, PodIndicator, SceneView, SpawnResult, StateAction, TimerHandle, TimerWheel, UnitError,
    UnitId, UnitRoster, UnitSpawner, handle_attack, time_utils,
};
use crate::scenario::ScenarioConfig;

/// 1回の実行で許容する最大ステップ数
const MAX_STEPS: u64 = 1_000_000;

/// タイマーで予約される処理
#[derive(Debug, Clone, PartialEq, Eq)]
enum SimTask {
    /// スポナー（インデックス）の準備完了
    SpawnerReady(usize),
    /// 死亡演出を終えたユニットの除去
    Despawn(UnitId),
}

/// 生存ユニットの概要
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivorSummary {
    pub id: UnitId,
    pub name: String,
    pub template: String,
    pub faction: Faction,
    pub health: f64,
    /// 体力バーの表示値（0.0〜1.0）
    pub health_percentage: f64,
}

/// スポナーポッドの最終状態
#[derive(Debug, Clone, PartialEq)]
pub struct PodSummary {
    pub id: String,
    pub faction: Faction,
    pub indicator: PodIndicator,
}

/// シミュレーション結果
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub elapsed_s: f64,
    pub steps: u64,
    pub spawned: u32,
    pub blocked: u32,
    pub attacks: u32,
    /// 前方検知（レイキャストと分類）の実行回数
    pub polls: u64,
    pub deaths: BTreeMap<String, u32>,
    pub survivors: Vec<SurvivorSummary>,
    pub pods: Vec<PodSummary>,
}

impl SimulationReport {
    pub fn deaths_of(&self, faction: Faction) -> u32 {
        self.deaths.get(&faction.to_string()).copied().unwrap_or(0)
    }

    pub fn survivors_of(&self, faction: Faction) -> usize {
        self.survivors.iter().filter(|s| s.faction == faction).count()
    }

    /// 結果の表示
    pub fn print(&self) {
        println!("=== シミュレーション結果 ===");
        println!("経過時間: {:.1}秒 ({}ステップ)", self.elapsed_s, self.steps);
        println!("生成: {}体 / スポーン失敗: {}回", self.spawned, self.blocked);
        println!("攻撃回数: {} / 前方検知: {}回", self.attacks, self.polls);
        for faction in [Faction::Player, Faction::Enemy] {
            println!(
                "{}: 死亡 {}体 / 生存 {}体",
                faction,
                self.deaths_of(faction),
                self.survivors_of(faction)
            );
        }
        for survivor in &self.survivors {
            println!(
                "  {} {} [{}]: 体力 {:.1} ({:.0}%)",
                survivor.id,
                survivor.name,
                survivor.template,
                survivor.health,
                survivor.health_percentage * 100.0
            );
        }
        for pod in &self.pods {
            println!("ポッド {} ({}): {:?}", pod.id, pod.faction, pod.indicator);
        }
    }
}

pub struct SimulationEngine {
    pub current_time_ms: u64,
    pub dt_ms: u64,
    pub max_time_ms: u64,
    pub step_count: u64,

    world: CollisionWorld,
    units: UnitRoster,
    spawners: Vec<UnitSpawner>,
    spawner_handles: Vec<TimerHandle>,
    timers: TimerWheel<SimTask>,
    despawn_handles: BTreeMap<UnitId, TimerHandle>,
    next_unit_id: u32,

    report: SimulationReport,
    poll_count: u64,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        let dt_ms = scenario.sim.dt_ms;
        let max_time_ms = time_utils::seconds_to_ms(scenario.sim.t_max_s);

        Self {
            current_time_ms: 0,
            dt_ms,
            max_time_ms,
            step_count: 0,
            world: CollisionWorld::default(),
            units: UnitRoster::new(),
            spawners: Vec::new(),
            spawner_handles: Vec::new(),
            timers: TimerWheel::new(),
            despawn_handles: BTreeMap::new(),
            next_unit_id: 1,
            report: SimulationReport::default(),
            poll_count: 0,
            scenario_config: scenario,
            verbose_level,
        }
    }

    /// 世界とスポナーを構築し、スポナーの準備タイマーを開始
    pub fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
        }

        self.world = CollisionWorld::new(
            self.scenario_config
                .world
                .obstacles
                .iter()
                .map(|o| o.to_obstacle())
                .collect(),
        );

        for spawner_config in &self.scenario_config.spawners {
            let template = self
                .scenario_config
                .template(&spawner_config.template)
                .ok_or_else(|| {
                    UnitError::Configuration(format!(
                        "spawner {}: unknown template {}",
                        spawner_config.id, spawner_config.template
                    ))
                })?;

            let spawner = UnitSpawner::new(spawner_config, template)?;
            let index = self.spawners.len();
            let handle = self
                .timers
                .start(SimTask::SpawnerReady(index), spawner.delay_ms(), spawner.repeats())?;
            self.spawner_handles.push(handle);

            if self.verbose_level > 1 {
                debug!(
                    "スポナー初期化: {} ({} / {}, 遅延 {}ms)",
                    spawner.id(),
                    spawner_config.template,
                    spawner.faction(),
                    spawner.delay_ms()
                );
            }
            self.spawners.push(spawner);
        }

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  静的障害物: {}個", self.world.obstacles.len());
            info!("  スポナー: {}基", self.spawners.len());
        }

        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.current_time_ms >= self.max_time_ms || self.step_count >= MAX_STEPS
    }

    pub fn run(&mut self) -> Result<SimulationReport, Box<dyn std::error::Error>> {
        info!("=== シミュレーション実行開始 ===");

        while !self.is_finished() {
            self.step()?;
        }

        Ok(self.finish())
    }

    /// シミュレーションを終了し、結果をまとめる
    ///
    /// 保留中のスポナー・除去タイマーはここで取り消されます。
    pub fn finish(&mut self) -> SimulationReport {
        info!("=== シミュレーション完了 ===");
        info!("実行時間: {:.1}秒", time_utils::ms_to_seconds(self.current_time_ms));
        info!("総ステップ数: {}", self.step_count);
        self.cancel_pending_timers();

        let mut report = self.report.clone();
        report.elapsed_s = time_utils::ms_to_seconds(self.current_time_ms);
        report.steps = self.step_count;
        report.polls = self.poll_count;
        report.survivors = self
            .units
            .values()
            .filter(|u| !u.is_dead())
            .map(|u| SurvivorSummary {
                id: u.id(),
                name: u.name().to_string(),
                template: u.template_id().to_string(),
                faction: u.unit_properties_manager().combat_stats().faction,
                health: u.unit_properties_manager().combat_stats().current_health(),
                health_percentage: u.unit_properties_manager().health_percentage(),
            })
            .collect();
        report.pods = self
            .spawners
            .iter()
            .map(|s| PodSummary {
                id: s.id().to_string(),
                faction: s.faction(),
                indicator: s.indicator(),
            })
            .collect();
        report
    }

    fn cancel_pending_timers(&mut self) {
        let pending = self.timers.len();
        for handle in self.spawner_handles.drain(..) {
            self.timers.cancel(handle);
        }
        for (_, handle) in std::mem::take(&mut self.despawn_handles) {
            self.timers.cancel(handle);
        }
        debug!("保留中のタイマーを取り消しました: {}件", pending);
    }

    /// 1ステップ進める
    pub fn step(&mut self) -> Result<(), UnitError> {
        self.process_timers()?;
        self.process_polls();
        self.process_transitions()?;
        self.process_attacks()?;
        self.process_movement();

        self.current_time_ms += self.dt_ms;
        self.step_count += 1;

        if self.verbose_level > 2 {
            trace!("時刻: {:.2}秒 (ステップ: {})", time_utils::ms_to_seconds(self.current_time_ms), self.step_count);
        }
        if self.step_count % 100 == 0 && self.verbose_level > 0 {
            let progress = self.current_time_ms as f64 / self.max_time_ms.max(1) as f64 * 100.0;
            info!(
                "進行状況: {:.1}% ({:.1}/{:.1}秒) ユニット: {}体",
                progress,
                time_utils::ms_to_seconds(self.current_time_ms),
                time_utils::ms_to_seconds(self.max_time_ms),
                self.units.len()
            );
        }

        Ok(())
    }

    fn process_timers(&mut self) -> Result<(), UnitError> {
        for (handle, task) in self.timers.advance(self.dt_ms) {
            match task {
                SimTask::SpawnerReady(index) => self.try_spawn(index)?,
                SimTask::Despawn(id) => {
                    self.despawn_handles.remove(&id);
                    if let Some(mut unit) = self.units.remove(&id) {
                        unit.teardown();
                        info!("{} ({}) を除去しました", unit.name(), id);
                    }
                    trace!("除去タイマー完了: {:?}", handle);
                }
            }
        }
        Ok(())
    }

    fn try_spawn(&mut self, index: usize) -> Result<(), UnitError> {
        let id = UnitId(self.next_unit_id);
        let result = {
            let Some(spawner) = self.spawners.get_mut(index) else {
                return Ok(());
            };
            let scene = SceneView::new(&self.world, &self.units);
            spawner.spawn_unit(&scene, id)?
        };

        match result {
            SpawnResult::Spawned(unit) => {
                self.next_unit_id += 1;
                self.report.spawned += 1;
                self.units.insert(id, unit);
            }
            SpawnResult::Blocked => self.report.blocked += 1,
        }
        Ok(())
    }

    /// ポーリング周期に達したユニットの前方を検知・分類し、フラグへ反映
    ///
    /// 1ティックに複数回発火した場合も、発火ごとに検知と分類を行います。
    fn process_polls(&mut self) {
        let dt_ms = self.dt_ms;
        let due: Vec<(UnitId, u32)> = self
            .units
            .iter_mut()
            .filter_map(|(id, unit)| {
                let fires = unit.spatial_detector_mut().advance(dt_ms);
                (fires > 0).then_some((*id, fires))
            })
            .collect();

        if due.is_empty() {
            return;
        }

        let mut results: Vec<(UnitId, DetectionResult, ObstacleType)> = Vec::new();
        {
            let scene = SceneView::new(&self.world, &self.units);
            for (id, fires) in due {
                let Some(unit) = self.units.get(&id) else {
                    continue;
                };
                let classifier = ObstacleDetector::new(unit);
                for _ in 0..fires {
                    let hit = unit
                        .spatial_detector()
                        .check_obstacle_forward(unit.collider_center(), &scene, id);
                    let obstacle = classifier.check_obstacle(&hit, &scene);
                    results.push((id, hit, obstacle));
                }
            }
        }

        for (id, hit, obstacle) in results {
            let Some(unit) = self.units.get_mut(&id) else {
                continue;
            };
            unit.handle_poll_result(hit, obstacle);
            self.poll_count += 1;
            trace!("{}: 前方 {:?}", unit.name(), obstacle);
        }
    }

    fn process_transitions(&mut self) -> Result<(), UnitError> {
        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        for id in ids {
            let action = match self.units.get_mut(&id) {
                Some(unit) => unit.evaluate_transition()?,
                None => continue,
            };
            self.apply_action(id, action)?;
        }
        Ok(())
    }

    /// 攻撃ケイデンスを進め、攻撃イベントを処理
    fn process_attacks(&mut self) -> Result<(), UnitError> {
        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        for id in ids {
            let actions: Vec<StateAction> = match self.units.get_mut(&id) {
                Some(unit) => {
                    let events = unit.attack_cadence_mut().advance(self.dt_ms);
                    events.iter().flat_map(|e| unit.animation_event(e)).collect()
                }
                None => continue,
            };

            for action in actions {
                self.apply_action(id, action)?;
            }
        }
        Ok(())
    }

    fn process_movement(&mut self) {
        let dt = time_utils::ms_to_seconds(self.dt_ms);
        for unit in self.units.values_mut() {
            unit.update(dt);
        }
    }

    /// 状態ビヘイビアからの依頼を実行
    fn apply_action(&mut self, id: UnitId, action: StateAction) -> Result<(), UnitError> {
        match action {
            StateAction::None => {}
            StateAction::Attack => self.resolve_attack(id)?,
            StateAction::Despawn { delay_ms } => {
                if !self.despawn_handles.contains_key(&id) {
                    let handle = self.timers.start(SimTask::Despawn(id), delay_ms, false)?;
                    self.despawn_handles.insert(id, handle);
                }
            }
        }
        Ok(())
    }

    fn resolve_attack(&mut self, attacker: UnitId) -> Result<(), UnitError> {
        // 攻撃の直前に倒された攻撃者は何もしない
        if self.units.get(&attacker).is_none_or(|u| u.is_dead()) {
            return Ok(());
        }

        let outcome = handle_attack(attacker, &mut self.units, &self.world);
        let AttackOutcome::Struck { target, result, .. } = outcome else {
            return Ok(());
        };
        self.report.attacks += 1;

        if result == DamageOutcome::Killed {
            let faction = self
                .units
                .get(&target)
                .map(|u| u.unit_properties_manager().combat_stats().faction);
            if let Some(faction) = faction {
                *self.report.deaths.entry(faction.to_string()).or_insert(0) += 1;
            }
        }

        let action = match self.units.get_mut(&target) {
            Some(unit) => unit.process_signals()?,
            None => StateAction::None,
        };
        self.apply_action(target, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        common::{Direction3D, Position3D},
        states::UnitAnimationState,
        test_support::{template_with, test_unit, unit_from},
        unit::Unit,
    };
    use crate::scenario::{ScenarioMeta, SimulationConfig};

    fn empty_scenario(t_max_s: f64) -> ScenarioConfig {
        ScenarioConfig {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "test".to_string(),
                description: String::new(),
            },
            sim: SimulationConfig { dt_ms: 20, t_max_s },
            world: Default::default(),
            unit_templates: Vec::new(),
            spawners: Vec::new(),
        }
    }

    impl SimulationEngine {
        /// スポナーを経由せずにユニットを配置
        fn add_unit(&mut self, unit: Unit) {
            self.next_unit_id = self.next_unit_id.max(unit.id().0 + 1);
            self.report.spawned += 1;
            self.units.insert(unit.id(), unit);
        }
    }

    fn engine(t_max_s: f64) -> SimulationEngine {
        let mut engine = SimulationEngine::new(empty_scenario(t_max_s), 0);
        engine.initialize().unwrap();
        engine
    }

    #[test]
    fn test_walk_poll_count_over_one_second() {
        let mut engine = engine(10.0);
        engine.add_unit(test_unit(1, Faction::Player, Position3D::default(), Direction3D::default()));

        // 最初の待機ポーリング（1秒）で歩行に入る
        for _ in 0..50 {
            engine.step().unwrap();
        }
        assert_eq!(engine.units.get(&UnitId(1)).unwrap().state(), UnitAnimationState::Moving);

        let before = engine.poll_count;
        for _ in 0..50 {
            engine.step().unwrap();
        }
        assert_eq!(engine.poll_count - before, 10);
    }

    #[test]
    fn test_coarse_step_classifies_every_poll() {
        let mut engine = engine(10.0);
        engine.dt_ms = 1000;
        engine.add_unit(test_unit(1, Faction::Player, Position3D::default(), Direction3D::default()));

        // 待機ポーリング1回で歩行に入る
        engine.step().unwrap();
        assert_eq!(engine.poll_count, 1);
        assert_eq!(engine.units.get(&UnitId(1)).unwrap().state(), UnitAnimationState::Moving);

        engine.step().unwrap();
        assert_eq!(engine.poll_count, 11);
    }

    #[test]
    fn test_units_close_in_and_fight() {
        let mut engine = engine(30.0);
        engine.add_unit(unit_from(
            1,
            &template_with(100.0, 20.0),
            Faction::Player,
            Position3D::new(-3.0, 0.0, 0.0),
            Direction3D::from_heading_deg(0.0),
        ));
        engine.add_unit(unit_from(
            2,
            &template_with(50.0, 5.0),
            Faction::Enemy,
            Position3D::new(3.0, 0.0, 0.0),
            Direction3D::from_heading_deg(180.0),
        ));

        let report = engine.run().unwrap();

        assert_eq!(report.deaths_of(Faction::Enemy), 1);
        assert_eq!(report.deaths_of(Faction::Player), 0);
        assert_eq!(report.survivors_of(Faction::Player), 1);
        // 3回で倒し、その間に2回反撃を受ける
        assert_eq!(report.attacks, 5);
        assert!(engine.units.get(&UnitId(2)).is_none());

        let winner = engine.units.get(&UnitId(1)).unwrap();
        assert_eq!(winner.unit_properties_manager().combat_stats().current_health(), 90.0);
    }

    #[test]
    fn test_dead_unit_is_despawned_after_delay() {
        let mut engine = engine(10.0);
        engine.add_unit(test_unit(1, Faction::Enemy, Position3D::default(), Direction3D::default()));

        engine
            .units
            .get_mut(&UnitId(1))
            .unwrap()
            .unit_properties_manager_mut()
            .combat_stats_mut()
            .take_damage(1000.0);
        let action = engine.units.get_mut(&UnitId(1)).unwrap().process_signals().unwrap();
        engine.apply_action(UnitId(1), action).unwrap();

        for _ in 0..49 {
            engine.step().unwrap();
        }
        assert_eq!(engine.units.get(&UnitId(1)).unwrap().state(), UnitAnimationState::Dead);

        engine.step().unwrap();
        assert!(engine.units.get(&UnitId(1)).is_none());
    }

    #[test]
    fn test_friendly_units_do_not_fight() {
        let mut engine = engine(20.0);
        engine.add_unit(test_unit(1, Faction::Player, Position3D::new(0.0, 0.0, 0.0), Direction3D::from_heading_deg(0.0)));
        engine.add_unit(test_unit(2, Faction::Player, Position3D::new(1.5, 0.0, 0.0), Direction3D::from_heading_deg(180.0)));

        let report = engine.run().unwrap();
        assert_eq!(report.attacks, 0);
        assert_eq!(report.survivors_of(Faction::Player), 2);
        for unit in engine.units.values() {
            assert_eq!(unit.unit_properties_manager().combat_stats().current_health(), 100.0);
            assert_eq!(unit.state(), UnitAnimationState::Idle);
        }
    }

    #[test]
    fn test_duel_scenario_from_spawners() {
        let scenario: ScenarioConfig = serde_yaml::from_str(include_str!("../scenarios/duel.yaml")).unwrap();
        scenario.validate().unwrap();

        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        let report = engine.run().unwrap();

        assert_eq!(report.spawned, 2);
        assert_eq!(report.blocked, 0);
        assert_eq!(report.deaths_of(Faction::Enemy), 1);
        assert_eq!(report.deaths_of(Faction::Player), 0);
        assert_eq!(report.survivors_of(Faction::Player), 1);
        assert_eq!(report.survivors[0].name, "Player swordsman");
        assert_eq!(report.survivors[0].template, "swordsman");
        assert!(report.survivors[0].health_percentage > 0.0 && report.survivors[0].health_percentage <= 1.0);
        assert_eq!(report.pods.len(), 2);
        assert!(report.pods.iter().all(|pod| pod.indicator == PodIndicator::Ready));
        assert!(report.polls > 0);
        assert_eq!(engine.timers.len(), 0);
    }

    #[test]
    fn test_skirmish_scenario_runs() {
        let scenario: ScenarioConfig = serde_yaml::from_str(include_str!("../scenarios/skirmish.yaml")).unwrap();
        scenario.validate().unwrap();

        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        let report = engine.run().unwrap();

        assert_eq!(engine.spawners.len(), 4);
        assert!(report.spawned >= 4);
        assert!(report.blocked > 0);
        assert!(report.attacks > 0);
    }

    #[test]
    fn test_step_advances_clock() {
        let mut engine = engine(1.0);
        let report = engine.run().unwrap();
        assert_eq!(report.steps, 50);
        assert_eq!(engine.current_time_ms, 1000);
        assert!(engine.is_finished());
    }
}
