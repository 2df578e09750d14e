use tracing::debug;

use crate::models::{
    animator::AnimationEvent,
    errors::UnitError,
    states::{StateAction, UnitAnimationState, UnitStateBehaviour},
    traits::IManaged,
    unit::Unit,
};

/// 攻撃状態
///
/// アニメーションの "Attack" イベントごとに攻撃の適用をエンジンへ依頼します。
/// この状態ではポーリングを行わず、攻撃時の再検知で敵の有無を確認します。
pub struct AttackState;

impl UnitStateBehaviour for AttackState {
    fn on_enter(&self, unit: &mut Unit) -> Result<StateAction, UnitError> {
        let attack_speed = unit.unit_properties_manager().combat_stats().attack_speed;
        unit.attack_cadence_mut().start(attack_speed)?;
        unit.animation_observer_mut().subscribe(UnitAnimationState::Attacking);
        Ok(StateAction::None)
    }

    fn on_exit(&self, unit: &mut Unit) {
        unit.animation_observer_mut().unsubscribe(UnitAnimationState::Attacking);
        unit.attack_cadence_mut().stop();
    }

    fn handle_animation(&self, unit: &Unit, event: &AnimationEvent) -> StateAction {
        match event {
            AnimationEvent::Attack => StateAction::Attack,
            other => {
                debug!("{}: 対応するアクションがないイベント: {:?}", unit.name(), other);
                StateAction::None
            }
        }
    }
}
