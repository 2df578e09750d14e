//! # States モジュール
//!
//! ユニットの有限状態機械を構成する状態ビヘイビアを提供します。
//!
//! 各状態は入場・退場・毎ティック更新のフックと、
//! 前方検知結果およびアニメーションイベントのハンドラを持ちます。
//! 次の状態の決定は `next_state` の遷移表が一元的に行い、
//! 状態ビヘイビア自身は遷移を決めません。
//!
//! ## 遷移表
//!
//! | 現在      | 条件                         | 次        |
//! |-----------|------------------------------|-----------|
//! | 任意      | is_dead                      | Dead      |
//! | Idle      | has_enemy                    | Attacking |
//! | Idle      | フラグなし                   | Moving    |
//! | Moving    | has_enemy                    | Attacking |
//! | Moving    | has_obstacle                 | Idle      |
//! | Attacking | has_enemy が下りた           | Idle      |
//! | Dead      | -                            | Dead      |

mod attack;
mod dead;
mod idle;
mod walk;

pub use attack::AttackState;
pub use dead::DeadState;
pub use idle::IdleState;
pub use walk::WalkState;

use crate::models::{
    animator::{AnimationEvent, AnimatorFlags},
    errors::UnitError,
    obstacle_detector::ObstacleType,
    unit::Unit,
};

/// ユニットのアニメーション状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitAnimationState {
    #[default]
    Idle,
    Moving,
    Attacking,
    Dead,
}

/// 状態ビヘイビアからエンジンへの依頼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    None,
    /// 前方の敵へ攻撃を適用する
    Attack,
    /// 指定時間後にユニットを除去する
    Despawn { delay_ms: u64 },
}

/// 状態ビヘイビアのインターフェース
pub trait UnitStateBehaviour {
    /// 状態に入ったときの処理
    fn on_enter(&self, unit: &mut Unit) -> Result<StateAction, UnitError>;

    /// 状態を抜けるときの処理
    fn on_exit(&self, _unit: &mut Unit) {}

    /// 状態にいる間、毎ティック呼ばれる
    fn on_update(&self, _unit: &mut Unit, _dt: f64) {}

    /// ポーリングによる前方検知結果の処理
    fn handle_poll(&self, _unit: &mut Unit, _obstacle: ObstacleType) {}

    /// アニメーションイベントの処理
    fn handle_animation(&self, _unit: &Unit, _event: &AnimationEvent) -> StateAction {
        StateAction::None
    }
}

/// 状態に対応するビヘイビア
pub fn behaviour(state: UnitAnimationState) -> &'static dyn UnitStateBehaviour {
    match state {
        UnitAnimationState::Idle => &IdleState,
        UnitAnimationState::Moving => &WalkState,
        UnitAnimationState::Attacking => &AttackState,
        UnitAnimationState::Dead => &DeadState,
    }
}

/// 遷移表に従って次の状態を決定
pub fn next_state(current: UnitAnimationState, flags: AnimatorFlags) -> UnitAnimationState {
    use UnitAnimationState::*;

    if current == Dead || flags.is_dead {
        return Dead;
    }

    match current {
        Idle if flags.has_enemy => Attacking,
        Idle if !flags.has_obstacle && !flags.has_friendly => Moving,
        Moving if flags.has_enemy => Attacking,
        Moving if flags.has_obstacle => Idle,
        Attacking if !flags.has_enemy => Idle,
        other => other,
    }
}
