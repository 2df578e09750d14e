use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::models::{
    animator::{Animator, AnimatorParam},
    combat_stats::CombatStats,
    common::Faction,
    errors::UnitError,
    observer::ListenerId,
};
use crate::scenario::UnitTemplateConfig;

/// 戦闘以外のユニット特性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitProperties {
    /// 歩行速度（m/s）
    pub walk_speed: f64,
}

/// ステータス購読から届くユニット宛ての通知
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitSignal {
    Damaged { damage: f64, previous: f64, remaining: f64 },
    Died,
}

/// 体力バー
///
/// 描画側は `health_percentage` を読むだけで、コアへは何も返しません。
#[derive(Debug, Default)]
pub struct HealthBar {
    value: Rc<Cell<f64>>,
    listener: Option<ListenerId>,
}

impl HealthBar {
    /// 戦闘ステータスの体力変化を購読
    pub fn set_combat_stats_ref(&mut self, combat_stats: &mut CombatStats) {
        self.value.set(combat_stats.health_percentage());
        let value = Rc::clone(&self.value);
        self.listener = Some(combat_stats.subscribe_to_health_changed(move |change| {
            value.set(change.health_percentage());
        }));
    }

    pub fn health_percentage(&self) -> f64 {
        self.value.get()
    }

    pub fn detach(&mut self, combat_stats: &mut CombatStats) {
        if let Some(id) = self.listener.take() {
            combat_stats.unsubscribe_from_health_changed(id);
        }
    }
}

/// ユニットのプロパティ管理
///
/// テンプレートから複製したステータスを所有し、死亡通知をユニットへ中継します。
#[derive(Debug)]
pub struct UnitPropertiesManager {
    unit_properties: UnitProperties,
    combat_stats: CombatStats,
    health_bar: HealthBar,
    damage_listener: Option<ListenerId>,
    death_listener: Option<ListenerId>,
    signals: Rc<RefCell<Vec<UnitSignal>>>,
}

impl UnitPropertiesManager {
    /// テンプレートからプロパティを生成し、イベントを配線
    pub fn new(template: &UnitTemplateConfig, faction: Faction) -> Result<Self, UnitError> {
        if !(template.walk_speed_mps.is_finite() && template.walk_speed_mps >= 0.0) {
            return Err(UnitError::Configuration(format!(
                "template {}: walk_speed_mps must be non-negative: {}",
                template.id, template.walk_speed_mps
            )));
        }

        let mut combat_stats = CombatStats::from_template(&template.combat, faction)
            .map_err(|e| UnitError::Configuration(format!("template {}: {}", template.id, e)))?;

        let mut health_bar = HealthBar::default();
        health_bar.set_combat_stats_ref(&mut combat_stats);

        let signals = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&signals);
        let damage_listener = combat_stats.subscribe_to_damage_taken(move |change| {
            sink.borrow_mut().push(UnitSignal::Damaged {
                damage: change.damage,
                previous: change.previous_health,
                remaining: change.current_health,
            })
        });
        let sink = Rc::clone(&signals);
        let death_listener = combat_stats.subscribe_to_death(move |_| sink.borrow_mut().push(UnitSignal::Died));

        Ok(Self {
            unit_properties: UnitProperties {
                walk_speed: template.walk_speed_mps,
            },
            combat_stats,
            health_bar,
            damage_listener: Some(damage_listener),
            death_listener: Some(death_listener),
            signals,
        })
    }

    pub fn unit_properties(&self) -> &UnitProperties {
        &self.unit_properties
    }

    pub fn combat_stats(&self) -> &CombatStats {
        &self.combat_stats
    }

    pub fn combat_stats_mut(&mut self) -> &mut CombatStats {
        &mut self.combat_stats
    }

    pub fn health_percentage(&self) -> f64 {
        self.health_bar.health_percentage()
    }

    /// 購読経由で届いた通知を取り出す
    pub fn take_signals(&mut self) -> Vec<UnitSignal> {
        std::mem::take(&mut *self.signals.borrow_mut())
    }

    /// 死亡時のフラグ更新
    pub fn on_death_handler(animator: &mut Animator) {
        animator.set_bool(AnimatorParam::IsDead, true);
        animator.set_bool(AnimatorParam::HasEnemy, false);
        animator.set_bool(AnimatorParam::HasFriendly, false);
        animator.set_bool(AnimatorParam::HasObstacle, false);
    }

    /// 破棄時の購読解除
    pub fn teardown(&mut self) {
        if let Some(id) = self.damage_listener.take() {
            self.combat_stats.unsubscribe_from_damage_taken(id);
        }
        if let Some(id) = self.death_listener.take() {
            self.combat_stats.unsubscribe_from_death(id);
        }
        self.health_bar.detach(&mut self.combat_stats);
        self.combat_stats.clear_listeners();
        self.signals.borrow_mut().clear();
    }
}
