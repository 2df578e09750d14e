use crate::models::{
    common::{CombatStyle, Faction},
    errors::UnitError,
    observer::{EventListeners, ListenerId},
};
use serde::{Deserialize, Serialize};

/// 戦闘ステータスのテンプレート（シナリオから読み込まれる）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CombatStatsTemplate {
    #[serde(default)]
    pub combat_style: CombatStyle,
    pub attack_damage: f64,
    /// 宣言のみでダメージ計算には使用しない
    #[serde(default)]
    pub defense: f64,
    pub max_health: f64,
    /// 1秒あたりの攻撃回数
    pub attack_speed: f64,
}

impl Default for CombatStatsTemplate {
    fn default() -> Self {
        Self {
            combat_style: CombatStyle::Melee,
            attack_damage: 10.0,
            defense: 5.0,
            max_health: 100.0,
            attack_speed: 1.0,
        }
    }
}

impl CombatStatsTemplate {
    /// テンプレートの妥当性を検証
    pub fn validate(&self) -> Result<(), UnitError> {
        if !(self.max_health.is_finite() && self.max_health > 0.0) {
            return Err(UnitError::Configuration(format!(
                "max_health must be positive: {}",
                self.max_health
            )));
        }
        if !(self.attack_speed.is_finite() && self.attack_speed > 0.0) {
            return Err(UnitError::Configuration(format!(
                "attack_speed must be positive: {}",
                self.attack_speed
            )));
        }
        if !(self.attack_damage.is_finite() && self.attack_damage >= 0.0) {
            return Err(UnitError::Configuration(format!(
                "attack_damage must be non-negative: {}",
                self.attack_damage
            )));
        }
        Ok(())
    }
}

/// 体力変化の通知内容
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthChange {
    pub previous_health: f64,
    pub current_health: f64,
    pub max_health: f64,
    pub damage: f64,
}

impl HealthChange {
    pub fn health_percentage(&self) -> f64 {
        self.current_health / self.max_health
    }
}

/// ダメージ適用結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// 既に死亡していたため何もしなかった
    AlreadyDead,
    /// 0以下のダメージのため何もしなかった
    Ignored,
    /// 体力が減少した
    Damaged { remaining: f64 },
    /// このダメージで死亡した
    Killed,
}

/// ユニットの戦闘ステータス
///
/// 体力は `take_damage` を通してのみ変化します。
/// 死亡通知は体力が0に達したティックで一度だけ発行されます。
#[derive(Debug)]
pub struct CombatStats {
    pub combat_style: CombatStyle,
    pub attack_damage: f64,
    pub defense: f64,
    pub max_health: f64,
    current_health: f64,
    pub attack_speed: f64,
    pub faction: Faction,

    on_damage_taken: EventListeners<HealthChange>,
    on_death: EventListeners<HealthChange>,
    on_health_changed: EventListeners<HealthChange>,
}

impl CombatStats {
    /// テンプレートから満タンの体力でステータスを生成
    pub fn from_template(template: &CombatStatsTemplate, faction: Faction) -> Result<Self, UnitError> {
        template.validate()?;

        Ok(Self {
            combat_style: template.combat_style,
            attack_damage: template.attack_damage,
            defense: template.defense,
            max_health: template.max_health,
            current_health: template.max_health,
            attack_speed: template.attack_speed,
            faction,
            on_damage_taken: EventListeners::new(),
            on_death: EventListeners::new(),
            on_health_changed: EventListeners::new(),
        })
    }

    pub fn current_health(&self) -> f64 {
        self.current_health
    }

    /// 最大体力に対する現在体力の割合（0.0〜1.0）
    pub fn health_percentage(&self) -> f64 {
        self.current_health / self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.current_health <= 0.0
    }

    /// ダメージを受ける
    ///
    /// 体力は0未満にならないよう切り詰められます。
    /// ダメージが正の場合は `on_health_changed`、`on_damage_taken` の順で通知し、
    /// 体力が0に達した場合は続けて `on_death` を一度だけ通知します。
    pub fn take_damage(&mut self, damage: f64) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::AlreadyDead;
        }
        if damage.is_nan() || damage <= 0.0 {
            return DamageOutcome::Ignored;
        }

        let previous_health = self.current_health;
        self.current_health = (self.current_health - damage).max(0.0);

        let change = HealthChange {
            previous_health,
            current_health: self.current_health,
            max_health: self.max_health,
            damage,
        };

        self.on_health_changed.emit(&change);
        self.on_damage_taken.emit(&change);

        if self.current_health > 0.0 {
            return DamageOutcome::Damaged {
                remaining: self.current_health,
            };
        }

        self.on_death.emit(&change);
        DamageOutcome::Killed
    }

    pub fn subscribe_to_damage_taken<F: FnMut(&HealthChange) + 'static>(&mut self, listener: F) -> ListenerId {
        self.on_damage_taken.subscribe(listener)
    }

    pub fn unsubscribe_from_damage_taken(&mut self, id: ListenerId) -> bool {
        self.on_damage_taken.unsubscribe(id)
    }

    pub fn subscribe_to_death<F: FnMut(&HealthChange) + 'static>(&mut self, listener: F) -> ListenerId {
        self.on_death.subscribe(listener)
    }

    pub fn unsubscribe_from_death(&mut self, id: ListenerId) -> bool {
        self.on_death.unsubscribe(id)
    }

    pub fn subscribe_to_health_changed<F: FnMut(&HealthChange) + 'static>(&mut self, listener: F) -> ListenerId {
        self.on_health_changed.subscribe(listener)
    }

    pub fn unsubscribe_from_health_changed(&mut self, id: ListenerId) -> bool {
        self.on_health_changed.unsubscribe(id)
    }

    /// 全リスナーを解除（ユニット破棄時）
    pub fn clear_listeners(&mut self) {
        self.on_damage_taken.clear();
        self.on_death.clear();
        self.on_health_changed.clear();
    }

    /// 登録中のリスナー総数
    pub fn listener_count(&self) -> usize {
        self.on_damage_taken.len() + self.on_death.len() + self.on_health_changed.len()
    }
}
