use crate::models::{
    common::Velocity3D,
    errors::UnitError,
    obstacle_detector::ObstacleType,
    states::{StateAction, UnitAnimationState, UnitStateBehaviour},
    traits::IManaged,
    unit::Unit,
};

/// 歩行状態
///
/// 移動中は衝突の危険があるため0.1秒周期で前方を確認します。
/// 味方も障害物として扱い、敵のみが攻撃への遷移条件になります。
pub struct WalkState;

impl WalkState {
    pub const POLL_INTERVAL_S: f64 = 0.1;

    fn walk(unit: &mut Unit, dt: f64) {
        if !unit.spatial_detector().can_move_forward() {
            return;
        }

        let walk_speed = unit.unit_properties_manager().unit_properties().walk_speed;
        let velocity = Velocity3D::along(unit.facing(), walk_speed);
        unit.move_by(velocity.displacement(dt));
    }
}

impl UnitStateBehaviour for WalkState {
    fn on_enter(&self, unit: &mut Unit) -> Result<StateAction, UnitError> {
        let forward = unit.facing();
        unit.spatial_detector_mut()
            .start_checking_on_interval(UnitAnimationState::Moving, Self::POLL_INTERVAL_S, forward)?;
        Ok(StateAction::None)
    }

    fn on_exit(&self, unit: &mut Unit) {
        unit.spatial_detector_mut().stop_checking(Some(UnitAnimationState::Moving));
    }

    fn on_update(&self, unit: &mut Unit, dt: f64) {
        Self::walk(unit, dt);
    }

    fn handle_poll(&self, unit: &mut Unit, obstacle: ObstacleType) {
        let flags = unit.animator_mut().flags_mut();
        flags.clear_detections();

        match obstacle {
            ObstacleType::None => {}
            ObstacleType::Friendly | ObstacleType::Obstacle => flags.has_obstacle = true,
            ObstacleType::Enemy => flags.has_enemy = true,
        }
    }
}
