use crate::models::{
    errors::UnitError,
    states::{StateAction, UnitStateBehaviour},
    unit::Unit,
};

/// 死亡状態（吸収状態）
///
/// 検知を止め、死亡アニメーションの再生時間を待ってからユニットの除去を依頼します。
pub struct DeadState;

impl DeadState {
    pub const DESPAWN_DELAY_MS: u64 = 1000;
}

impl UnitStateBehaviour for DeadState {
    fn on_enter(&self, unit: &mut Unit) -> Result<StateAction, UnitError> {
        unit.spatial_detector_mut().stop_checking(None);
        unit.attack_cadence_mut().stop();
        unit.animation_observer_mut().remove_all_listeners();

        Ok(StateAction::Despawn {
            delay_ms: Self::DESPAWN_DELAY_MS,
        })
    }
}
