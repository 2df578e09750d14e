use crate::models::{
    errors::UnitError,
    obstacle_detector::ObstacleType,
    states::{StateAction, UnitAnimationState, UnitStateBehaviour},
    unit::Unit,
};

/// 待機状態
///
/// 1秒周期で前方を確認し、結果を遷移条件フラグへ反映します。
pub struct IdleState;

impl IdleState {
    pub const POLL_INTERVAL_S: f64 = 1.0;
}

impl UnitStateBehaviour for IdleState {
    fn on_enter(&self, unit: &mut Unit) -> Result<StateAction, UnitError> {
        let forward = unit.facing();
        unit.spatial_detector_mut()
            .start_checking_on_interval(UnitAnimationState::Idle, Self::POLL_INTERVAL_S, forward)?;
        Ok(StateAction::None)
    }

    fn on_exit(&self, unit: &mut Unit) {
        unit.spatial_detector_mut().stop_checking(Some(UnitAnimationState::Idle));
    }

    fn handle_poll(&self, unit: &mut Unit, obstacle: ObstacleType) {
        let flags = unit.animator_mut().flags_mut();
        flags.clear_detections();

        match obstacle {
            ObstacleType::None => {}
            ObstacleType::Friendly => {
                flags.has_obstacle = true;
                flags.has_friendly = true;
            }
            ObstacleType::Obstacle => flags.has_obstacle = true,
            ObstacleType::Enemy => flags.has_enemy = true,
        }
    }
}
