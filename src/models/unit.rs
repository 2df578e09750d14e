use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::models::{
    animator::{AnimationObserver, Animator, AttackCadence},
    common::{Direction3D, Faction, Position3D, UnitId},
    errors::UnitError,
    obstacle_detector::ObstacleType,
    physics::{CapsuleShape, UnitCollider},
    spatial_detector::{DetectionResult, SpatialDetector},
    states::{StateAction, UnitAnimationState, behaviour, next_state},
    traits::IManaged,
    unit_properties::{UnitPropertiesManager, UnitSignal},
};
use crate::scenario::UnitTemplateConfig;

/// 生存中（死亡演出中を含む）のユニット一覧
pub type UnitRoster = BTreeMap<UnitId, Unit>;

/// ユニット（集約ルート）
///
/// ステータス、検知器、アニメーター、状態をまとめて所有します。
/// 他ユニットから変更されるのは `take_damage` 経由の体力のみです。
#[derive(Debug)]
pub struct Unit {
    id: UnitId,
    name: String,
    template_id: String,
    /// 足元の位置
    position: Position3D,
    facing: Direction3D,
    collider: CapsuleShape,
    properties: UnitPropertiesManager,
    detector: SpatialDetector,
    animator: Animator,
    animation_observer: AnimationObserver,
    attack_cadence: AttackCadence,
}

impl Unit {
    /// テンプレートからユニットを生成し、待機状態に入る
    ///
    /// 構成に欠陥がある場合は `UnitError::Configuration` を返し、ユニットは生成されません。
    pub fn spawn(
        id: UnitId,
        name: String,
        template: &UnitTemplateConfig,
        faction: Faction,
        position: Position3D,
        facing: Direction3D,
    ) -> Result<Self, UnitError> {
        let collider = template.collider_shape();
        if !collider.is_valid() {
            return Err(UnitError::Configuration(format!(
                "template {}: collider bounds are zero",
                template.id
            )));
        }

        let properties = UnitPropertiesManager::new(template, faction)?;
        let detector = SpatialDetector::new(template.detector_distance_m, facing)
            .map_err(|e| UnitError::Configuration(format!("template {}: {}", template.id, e)))?;

        let mut unit = Self {
            id,
            name,
            template_id: template.id.clone(),
            position,
            facing,
            collider,
            properties,
            detector,
            animator: Animator::new(),
            animation_observer: AnimationObserver::new(),
            attack_cadence: AttackCadence::new(),
        };

        let stats = unit.properties.combat_stats();
        debug!(
            "{}: {:?} / 攻撃力 {:.0} / 防御力 {:.0}",
            unit.name, stats.combat_style, stats.attack_damage, stats.defense
        );

        behaviour(UnitAnimationState::Idle).on_enter(&mut unit)?;
        Ok(unit)
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn position(&self) -> Position3D {
        self.position
    }

    pub fn facing(&self) -> Direction3D {
        self.facing
    }

    pub fn state(&self) -> UnitAnimationState {
        self.animator.state()
    }

    pub fn is_dead(&self) -> bool {
        self.properties.combat_stats().is_dead()
    }

    pub fn move_by(&mut self, displacement: Position3D) {
        self.position = self.position + displacement;
    }

    pub fn collider(&self) -> UnitCollider {
        UnitCollider {
            id: self.id,
            base: self.position,
            shape: self.collider,
        }
    }

    pub fn unit_properties_manager_mut(&mut self) -> &mut UnitPropertiesManager {
        &mut self.properties
    }

    pub fn spatial_detector_mut(&mut self) -> &mut SpatialDetector {
        &mut self.detector
    }

    pub fn animator_mut(&mut self) -> &mut Animator {
        &mut self.animator
    }

    pub fn animation_observer_mut(&mut self) -> &mut AnimationObserver {
        &mut self.animation_observer
    }

    pub fn attack_cadence_mut(&mut self) -> &mut AttackCadence {
        &mut self.attack_cadence
    }

    /// 状態を遷移（退場フック → 入場フック → 状態更新）
    ///
    /// 同じ状態への遷移やDeadからの遷移は何もしません。
    /// 入場フックが失敗した場合は元の状態に入り直し、状態は更新しません。
    pub fn transition_to(&mut self, next: UnitAnimationState) -> Result<StateAction, UnitError> {
        let current = self.animator.state();
        if current == next || current == UnitAnimationState::Dead {
            return Ok(StateAction::None);
        }

        behaviour(current).on_exit(self);
        let action = match behaviour(next).on_enter(self) {
            Ok(action) => action,
            Err(e) => {
                behaviour(current).on_enter(self)?;
                return Err(e);
            }
        };

        self.animator.set_state(next);
        debug!("{}: {:?} -> {:?}", self.name, current, next);
        Ok(action)
    }

    /// 遷移条件フラグから次の状態を評価して遷移
    pub fn evaluate_transition(&mut self) -> Result<StateAction, UnitError> {
        let next = next_state(self.animator.state(), self.animator.flags());
        self.transition_to(next)
    }

    /// ステータス購読から届いた通知を処理
    ///
    /// 死亡通知を受けた場合はその場で死亡状態へ遷移します。
    pub fn process_signals(&mut self) -> Result<StateAction, UnitError> {
        let mut died = false;
        for signal in self.properties.take_signals() {
            match signal {
                UnitSignal::Damaged {
                    damage,
                    previous,
                    remaining,
                } => {
                    debug!("{}: {:.1}のダメージ (体力 {:.1} -> {:.1})", self.name, damage, previous, remaining);
                }
                UnitSignal::Died => {
                    info!("{} が倒れました", self.name);
                    UnitPropertiesManager::on_death_handler(&mut self.animator);
                    died = true;
                }
            }
        }

        if !died {
            return Ok(StateAction::None);
        }
        self.evaluate_transition()
    }

    /// 状態ごとの毎ティック処理
    pub fn update(&mut self, dt: f64) {
        behaviour(self.animator.state()).on_update(self, dt);
    }

    /// ポーリング結果を記録し、登録中のリスナーへ配送
    pub fn handle_poll_result(&mut self, result: DetectionResult, obstacle: ObstacleType) {
        self.detector.record_result(result);

        let listeners = self.detector.listeners().to_vec();
        for listener in listeners {
            behaviour(listener).handle_poll(self, obstacle);
        }
    }

    /// アニメーションイベントを購読中の状態へ配送し、依頼をまとめて返す
    pub fn animation_event(&self, message: &str) -> Vec<StateAction> {
        self.animation_observer
            .animation_event(message)
            .into_iter()
            .map(|(state, event)| behaviour(state).handle_animation(self, &event))
            .filter(|action| *action != StateAction::None)
            .collect()
    }

    /// 除去前の後片付け（購読解除とポーリング停止）
    pub fn teardown(&mut self) {
        self.detector.stop_checking(None);
        self.attack_cadence.stop();
        self.animation_observer.remove_all_listeners();

        let subscriptions = self.properties.combat_stats().listener_count();
        self.properties.teardown();
        debug!("{}: ステータス購読を{}件解除", self.name, subscriptions);
    }
}

impl IManaged for Unit {
    fn unit_id(&self) -> UnitId {
        self.id
    }

    fn unit_properties_manager(&self) -> &UnitPropertiesManager {
        &self.properties
    }

    fn animator(&self) -> &Animator {
        &self.animator
    }

    fn spatial_detector(&self) -> &SpatialDetector {
        &self.detector
    }

    fn collider_center(&self) -> Position3D {
        self.collider.center_from_base(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{template, test_unit};

    #[test]
    fn test_spawn_enters_idle_and_polls() {
        let unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        assert_eq!(unit.state(), UnitAnimationState::Idle);
        assert_eq!(unit.spatial_detector().listeners(), &[UnitAnimationState::Idle]);
    }

    #[test]
    fn test_zero_collider_is_configuration_error() {
        let mut bad = template();
        bad.collider.radius_m = 0.0;
        let result = Unit::spawn(
            UnitId(1),
            "broken".to_string(),
            &bad,
            Faction::Player,
            Position3D::default(),
            Direction3D::default(),
        );
        assert!(matches!(result, Err(UnitError::Configuration(_))));
    }

    #[test]
    fn test_idle_to_moving_switches_poll_listener() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.handle_poll_result(DetectionResult::none(), ObstacleType::None);
        unit.evaluate_transition().unwrap();

        assert_eq!(unit.state(), UnitAnimationState::Moving);
        assert_eq!(unit.spatial_detector().listeners(), &[UnitAnimationState::Moving]);
    }

    #[test]
    fn test_walk_moves_forward() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.transition_to(UnitAnimationState::Moving).unwrap();
        unit.update(2.0);

        let walk_speed = template().walk_speed_mps;
        assert!((unit.position().x - 2.0 * walk_speed).abs() < 1e-9);
    }

    #[test]
    fn test_idle_does_not_move() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.update(2.0);
        assert_eq!(unit.position(), Position3D::default());
    }

    #[test]
    fn test_walking_into_friendly_stops() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.transition_to(UnitAnimationState::Moving).unwrap();
        unit.handle_poll_result(DetectionResult::none(), ObstacleType::Friendly);

        assert!(unit.animator().flags().has_obstacle);
        assert!(!unit.animator().flags().has_friendly);
        unit.evaluate_transition().unwrap();
        assert_eq!(unit.state(), UnitAnimationState::Idle);
    }

    #[test]
    fn test_idle_records_friendly() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.handle_poll_result(DetectionResult::none(), ObstacleType::Friendly);

        let flags = unit.animator().flags();
        assert!(flags.has_obstacle && flags.has_friendly && !flags.has_enemy);
    }

    #[test]
    fn test_attack_state_routes_attack_event() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.handle_poll_result(DetectionResult::none(), ObstacleType::Enemy);
        unit.evaluate_transition().unwrap();

        assert_eq!(unit.state(), UnitAnimationState::Attacking);
        assert!(unit.spatial_detector().listeners().is_empty());
        assert_eq!(unit.animation_event("Attack"), vec![StateAction::Attack]);
        assert!(unit.animation_event("Footstep").is_empty());

        unit.animator_mut().flags_mut().has_enemy = false;
        unit.evaluate_transition().unwrap();
        assert_eq!(unit.state(), UnitAnimationState::Idle);
        assert!(unit.animation_event("Attack").is_empty());
    }

    #[test]
    fn test_death_signal_enters_dead_and_stops_polling() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.unit_properties_manager_mut().combat_stats_mut().take_damage(10_000.0);

        let action = unit.process_signals().unwrap();
        assert_eq!(action, StateAction::Despawn { delay_ms: 1000 });
        assert_eq!(unit.state(), UnitAnimationState::Dead);
        assert!(unit.spatial_detector().listeners().is_empty());
        assert_eq!(unit.spatial_detector_mut().advance(10_000), 0);

        assert_eq!(unit.transition_to(UnitAnimationState::Idle).unwrap(), StateAction::None);
        assert_eq!(unit.state(), UnitAnimationState::Dead);
    }

    #[test]
    fn test_teardown_clears_subscriptions() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.teardown();
        assert_eq!(unit.unit_properties_manager().combat_stats().listener_count(), 0);
        assert!(unit.spatial_detector().listeners().is_empty());
    }

    #[test]
    fn test_failed_enter_keeps_previous_state() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.transition_to(UnitAnimationState::Moving).unwrap();
        unit.unit_properties_manager_mut().combat_stats_mut().attack_speed = 0.0;

        let result = unit.transition_to(UnitAnimationState::Attacking);
        assert!(matches!(result, Err(UnitError::InvalidOperation(_))));
        assert_eq!(unit.state(), UnitAnimationState::Moving);
        assert_eq!(unit.spatial_detector().listeners(), &[UnitAnimationState::Moving]);
        assert!(unit.animation_event("Attack").is_empty());
    }

    #[test]
    fn test_walk_waits_while_front_is_blocked() {
        let mut unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        unit.transition_to(UnitAnimationState::Moving).unwrap();
        unit.spatial_detector_mut().record_result(DetectionResult {
            has_hit: true,
            hit_entity_id: None,
            distance: 0.5,
        });

        unit.update(1.0);
        assert_eq!(unit.position(), Position3D::default());
    }
}
