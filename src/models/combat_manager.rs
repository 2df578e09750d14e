use tracing::debug;

use crate::models::{
    animator::AnimatorParam,
    combat_stats::DamageOutcome,
    common::UnitId,
    obstacle_detector::{ObstacleDetector, ObstacleType},
    physics::CollisionWorld,
    scene::SceneView,
    spatial_detector::DetectionResult,
    traits::{ICombatantLookup, IManaged, IRaycaster},
    unit::UnitRoster,
};

/// 攻撃タイミングでの判定結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttackDecision {
    /// 前方に戦闘可能な相手がいない（静的障害物、死亡、不在を含む）
    LostTarget,
    /// 前方が味方（攻撃しない）
    Friendly(UnitId),
    /// 敵にダメージを与える
    Strike { target: UnitId, damage: f64 },
}

/// 攻撃を適用した結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttackOutcome {
    /// 攻撃者が存在しない、またはターゲットを失った
    NoTarget,
    Friendly(UnitId),
    Struck { target: UnitId, damage: f64, result: DamageOutcome },
}

/// 攻撃イベント時に前方を再検知してダメージを適用するサブコンポーネント
pub struct CombatManager<'a> {
    owner: &'a dyn IManaged,
}

impl<'a> CombatManager<'a> {
    pub fn new(owner: &'a dyn IManaged) -> Self {
        Self { owner }
    }

    /// 前方を再検知し、攻撃の可否を判定
    ///
    /// 攻撃状態ではポーリングが止まっているため、攻撃のたびに改めてレイを撃ちます。
    pub fn resolve_attack(&self, raycaster: &dyn IRaycaster, lookup: &dyn ICombatantLookup) -> AttackDecision {
        let hit: DetectionResult = self.owner.spatial_detector().check_obstacle_forward(
            self.owner.collider_center(),
            raycaster,
            self.owner.unit_id(),
        );

        match ObstacleDetector::new(self.owner).check_obstacle(&hit, lookup) {
            ObstacleType::Enemy => match hit.hit_entity_id {
                Some(target) => AttackDecision::Strike {
                    target,
                    damage: self.owner.unit_properties_manager().combat_stats().attack_damage,
                },
                None => AttackDecision::LostTarget,
            },
            ObstacleType::Friendly => match hit.hit_entity_id {
                Some(id) => AttackDecision::Friendly(id),
                None => AttackDecision::LostTarget,
            },
            ObstacleType::None | ObstacleType::Obstacle => AttackDecision::LostTarget,
        }
    }
}

/// 攻撃者の攻撃を解決し、結果をシーンへ適用
///
/// ターゲットを失った場合は攻撃者の `has_enemy` を下ろし、次の遷移評価で待機へ戻します。
/// 死亡処理（状態遷移）は呼び出し側がターゲットの通知を処理して行います。
pub fn handle_attack(attacker: UnitId, roster: &mut UnitRoster, world: &CollisionWorld) -> AttackOutcome {
    let decision = {
        let Some(unit) = roster.get(&attacker) else {
            return AttackOutcome::NoTarget;
        };
        let scene = SceneView::new(world, roster);
        CombatManager::new(unit).resolve_attack(&scene, &scene)
    };

    match decision {
        AttackDecision::LostTarget => {
            if let Some(unit) = roster.get_mut(&attacker) {
                unit.animator_mut().set_bool(AnimatorParam::HasEnemy, false);
                debug!("{}: 攻撃対象を見失いました", unit.name());
            }
            AttackOutcome::NoTarget
        }
        AttackDecision::Friendly(id) => AttackOutcome::Friendly(id),
        AttackDecision::Strike { target, damage } => {
            let Some(victim) = roster.get_mut(&target) else {
                return AttackOutcome::NoTarget;
            };
            let result = victim
                .unit_properties_manager_mut()
                .combat_stats_mut()
                .take_damage(damage);
            debug!(
                "{} -> {}: {} ダメージ (残り {:.1})",
                attacker,
                target,
                damage,
                victim.unit_properties_manager().combat_stats().current_health()
            );
            AttackOutcome::Struck { target, damage, result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        common::{Direction3D, Faction, Position3D},
        physics::{Aabb, StaticObstacle},
        test_support::{template_with, test_unit, unit_from},
    };

    fn duel(defender_faction: Faction) -> UnitRoster {
        let mut roster = UnitRoster::new();
        let attacker = unit_from(
            1,
            &template_with(100.0, 20.0),
            Faction::Player,
            Position3D::new(0.0, 0.0, 0.0),
            Direction3D::from_heading_deg(0.0),
        );
        let defender = unit_from(
            2,
            &template_with(50.0, 5.0),
            defender_faction,
            Position3D::new(1.0, 0.0, 0.0),
            Direction3D::from_heading_deg(180.0),
        );
        roster.insert(attacker.id(), attacker);
        roster.insert(defender.id(), defender);
        roster
    }

    fn health(roster: &UnitRoster, id: u32) -> f64 {
        roster[&UnitId(id)].unit_properties_manager().combat_stats().current_health()
    }

    #[test]
    fn test_five_attacks_kill_once() {
        let mut roster = duel(Faction::Enemy);
        let world = CollisionWorld::default();

        let mut remaining = Vec::new();
        let mut kills = 0;
        for _ in 0..5 {
            if let AttackOutcome::Struck { result: DamageOutcome::Killed, .. } =
                handle_attack(UnitId(1), &mut roster, &world)
            {
                kills += 1;
            }
            remaining.push(health(&roster, 2));
        }

        assert_eq!(remaining, vec![30.0, 10.0, 0.0, 0.0, 0.0]);
        assert_eq!(kills, 1);
    }

    #[test]
    fn test_dead_target_clears_has_enemy() {
        let mut roster = duel(Faction::Enemy);
        let world = CollisionWorld::default();
        for _ in 0..3 {
            handle_attack(UnitId(1), &mut roster, &world);
        }

        roster.get_mut(&UnitId(1)).unwrap().animator_mut().set_bool(AnimatorParam::HasEnemy, true);
        assert_eq!(handle_attack(UnitId(1), &mut roster, &world), AttackOutcome::NoTarget);
        assert!(!roster[&UnitId(1)].animator().flags().has_enemy);
    }

    #[test]
    fn test_same_faction_is_not_damaged() {
        let mut roster = duel(Faction::Player);
        let world = CollisionWorld::default();

        assert_eq!(
            handle_attack(UnitId(1), &mut roster, &world),
            AttackOutcome::Friendly(UnitId(2))
        );
        assert_eq!(health(&roster, 2), 50.0);
    }

    #[test]
    fn test_empty_front_clears_has_enemy() {
        let mut roster = UnitRoster::new();
        let unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        roster.insert(unit.id(), unit);
        roster.get_mut(&UnitId(1)).unwrap().animator_mut().set_bool(AnimatorParam::HasEnemy, true);

        assert_eq!(
            handle_attack(UnitId(1), &mut roster, &CollisionWorld::default()),
            AttackOutcome::NoTarget
        );
        assert!(!roster[&UnitId(1)].animator().flags().has_enemy);
    }

    #[test]
    fn test_static_obstacle_is_not_a_target() {
        let mut roster = UnitRoster::new();
        let unit = test_unit(1, Faction::Player, Position3D::default(), Direction3D::default());
        roster.insert(unit.id(), unit);
        let world = CollisionWorld::new(vec![StaticObstacle {
            id: "wall".to_string(),
            bounds: Aabb::new(Position3D::new(0.8, 0.0, 1.0), Position3D::new(0.2, 2.0, 1.0)),
        }]);

        assert_eq!(handle_attack(UnitId(1), &mut roster, &world), AttackOutcome::NoTarget);
    }

    #[test]
    fn test_missing_attacker() {
        let mut roster = duel(Faction::Enemy);
        assert_eq!(
            handle_attack(UnitId(42), &mut roster, &CollisionWorld::default()),
            AttackOutcome::NoTarget
        );
    }
}
