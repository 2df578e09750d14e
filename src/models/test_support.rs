//! テスト用のユニット構築ヘルパー

use crate::models::{
    combat_stats::CombatStatsTemplate,
    common::{Direction3D, Faction, Position3D, UnitId},
    unit::Unit,
};
use crate::scenario::{self, ColliderConfig, SpawnTimerConfig, SpawnerConfig, UnitTemplateConfig};

/// 体力100、攻撃力10の標準テンプレート
pub fn template() -> UnitTemplateConfig {
    UnitTemplateConfig {
        id: "soldier".to_string(),
        walk_speed_mps: 1.5,
        detector_distance_m: 1.5,
        collider: ColliderConfig {
            radius_m: 0.4,
            height_m: 2.0,
        },
        combat: CombatStatsTemplate::default(),
    }
}

pub fn template_with(max_health: f64, attack_damage: f64) -> UnitTemplateConfig {
    let mut template = template();
    template.combat.max_health = max_health;
    template.combat.attack_damage = attack_damage;
    template
}

pub fn unit_from(
    id: u32,
    template: &UnitTemplateConfig,
    faction: Faction,
    position: Position3D,
    facing: Direction3D,
) -> Unit {
    Unit::spawn(
        UnitId(id),
        format!("{} {}", faction, template.id),
        template,
        faction,
        position,
        facing,
    )
    .unwrap()
}

pub fn test_unit(id: u32, faction: Faction, position: Position3D, facing: Direction3D) -> Unit {
    unit_from(id, &template(), faction, position, facing)
}

pub fn spawner_config(id: &str, faction: Faction) -> SpawnerConfig {
    SpawnerConfig {
        id: id.to_string(),
        template: "soldier".to_string(),
        faction,
        position: scenario::Position3D::default(),
        facing_deg: 0.0,
        v_offset_m: 0.0,
        timer: SpawnTimerConfig {
            delay_ms: 500,
            repeat: false,
        },
    }
}
