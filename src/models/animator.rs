//! # Animator モジュール
//!
//! ユニットのアニメーション状態、状態遷移条件のフラグ、
//! およびアニメーションイベントの受信口を提供します。
//!
//! 実際のアニメーションクリップ再生は扱わず、攻撃アニメーションの
//! 打撃タイミングは `AttackCadence` が攻撃速度から生成します。

use crate::models::{
    states::UnitAnimationState,
    timer::{RepeatingTimer, TimerError},
};

/// 遷移条件パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorParam {
    HasObstacle,
    HasEnemy,
    HasFriendly,
    IsDead,
}

/// 遷移条件フラグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimatorFlags {
    pub has_obstacle: bool,
    pub has_enemy: bool,
    pub has_friendly: bool,
    pub is_dead: bool,
}

impl AnimatorFlags {
    /// 障害物系のフラグをすべて下ろす
    pub fn clear_detections(&mut self) {
        self.has_obstacle = false;
        self.has_enemy = false;
        self.has_friendly = false;
    }
}

/// ユニットのアニメーター
///
/// 現在の状態は常にここで一元管理されます。
#[derive(Debug, Clone, Default)]
pub struct Animator {
    state: UnitAnimationState,
    flags: AnimatorFlags,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> UnitAnimationState {
        self.state
    }

    /// 状態を設定（Deadからは抜けられない）
    ///
    /// # 戻り値
    ///
    /// 状態が変化した場合はtrue
    pub fn set_state(&mut self, next: UnitAnimationState) -> bool {
        if self.state == UnitAnimationState::Dead || self.state == next {
            return false;
        }
        self.state = next;
        true
    }

    pub fn flags(&self) -> AnimatorFlags {
        self.flags
    }

    pub fn set_bool(&mut self, param: AnimatorParam, value: bool) {
        match param {
            AnimatorParam::HasObstacle => self.flags.has_obstacle = value,
            AnimatorParam::HasEnemy => self.flags.has_enemy = value,
            AnimatorParam::HasFriendly => self.flags.has_friendly = value,
            AnimatorParam::IsDead => self.flags.is_dead = value,
        }
    }

    pub fn flags_mut(&mut self) -> &mut AnimatorFlags {
        &mut self.flags
    }
}

/// アニメーションイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationEvent {
    Attack,
    AttackEnd,
    Death,
    Other(String),
}

impl AnimationEvent {
    /// アニメーションアセットから届く文字列を解釈
    pub fn parse(message: &str) -> Self {
        match message {
            "Attack" => AnimationEvent::Attack,
            "AttackEnd" => AnimationEvent::AttackEnd,
            "Death" => AnimationEvent::Death,
            other => AnimationEvent::Other(other.to_string()),
        }
    }
}

/// アニメーションイベントの受信口
///
/// 状態ビヘイビアは入場時に購読し、退場時に解除します。
/// イベントは購読中の状態へそのまま配送されます。
#[derive(Debug, Clone, Default)]
pub struct AnimationObserver {
    subscribers: Vec<UnitAnimationState>,
}

impl AnimationObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 購読を追加（同じ状態の二重登録はしない）
    pub fn subscribe(&mut self, state: UnitAnimationState) {
        if !self.subscribers.contains(&state) {
            self.subscribers.push(state);
        }
    }

    pub fn unsubscribe(&mut self, state: UnitAnimationState) {
        self.subscribers.retain(|s| *s != state);
    }

    pub fn remove_all_listeners(&mut self) {
        self.subscribers.clear();
    }

    /// アニメーションイベントを受け取り、配送先の一覧を返す
    pub fn animation_event(&self, message: &str) -> Vec<(UnitAnimationState, AnimationEvent)> {
        let event = AnimationEvent::parse(message);
        self.subscribers.iter().map(|state| (*state, event.clone())).collect()
    }
}

/// 攻撃アニメーションの打撃タイミング生成器
///
/// 攻撃状態の間、攻撃速度（回/秒）に応じた周期で "Attack" を発行します。
#[derive(Debug, Clone, Default)]
pub struct AttackCadence {
    timer: RepeatingTimer,
}

impl AttackCadence {
    pub const ATTACK_EVENT: &'static str = "Attack";

    pub fn new() -> Self {
        Self::default()
    }

    /// 攻撃速度から周期を求めて開始
    pub fn start(&mut self, attack_speed: f64) -> Result<(), TimerError> {
        let period_ms = if attack_speed.is_finite() && attack_speed > 0.0 {
            (1000.0 / attack_speed).round() as u64
        } else {
            0
        };
        self.timer.start(period_ms)
    }

    pub fn stop(&mut self) {
        self.timer.stop();
    }

    /// 時間を進め、発行すべきイベントを返す
    pub fn advance(&mut self, dt_ms: u64) -> Vec<&'static str> {
        let fires = self.timer.advance(dt_ms);
        vec![Self::ATTACK_EVENT; fires as usize]
    }
}
