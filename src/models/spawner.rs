use tracing::{info, warn};

use crate::models::{
    common::{Direction3D, Faction, Position3D, UnitId},
    errors::UnitError,
    physics::{Aabb, CapsuleShape},
    traits::ISpaceQuery,
    unit::Unit,
};
use crate::scenario::{SpawnerConfig, UnitTemplateConfig};

/// スポナーポッドの表示状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PodIndicator {
    #[default]
    Ready,
    Blocked,
}

/// スポーン試行の結果
#[derive(Debug)]
pub enum SpawnResult {
    Spawned(Unit),
    /// 出現位置が塞がっていたため生成しなかった
    Blocked,
}

/// スポナーポッド
///
/// 出現位置の空きを確認してから、テンプレートのユニットを生成します。
#[derive(Debug, Clone)]
pub struct UnitSpawner {
    id: String,
    template: UnitTemplateConfig,
    faction: Faction,
    /// ポッドの位置
    position: Position3D,
    /// ポッド位置からの鉛直オフセット（メートル）
    v_offset: f64,
    facing: Direction3D,
    collider: CapsuleShape,
    indicator: PodIndicator,
    delay_ms: u64,
    repeat: bool,
}

impl UnitSpawner {
    /// スポナーを構築
    ///
    /// # 引数
    ///
    /// * `config` - スポナー設定
    /// * `template` - 生成するユニットのテンプレート
    ///
    /// # 戻り値
    ///
    /// テンプレートのコライダーの半径か高さが正でない場合は `UnitError::Configuration`
    pub fn new(config: &SpawnerConfig, template: &UnitTemplateConfig) -> Result<Self, UnitError> {
        let collider = template.collider_shape();
        if !collider.is_valid() {
            return Err(UnitError::Configuration(format!(
                "spawner {}: collider radius and height must be positive ({} / {})",
                config.id, collider.radius, collider.height
            )));
        }

        Ok(Self {
            id: config.id.clone(),
            template: template.clone(),
            faction: config.faction,
            position: config.position.to_position(),
            v_offset: config.v_offset_m,
            facing: Direction3D::from_heading_deg(config.facing_deg),
            collider,
            indicator: PodIndicator::Ready,
            delay_ms: config.timer.delay_ms,
            repeat: config.timer.repeat,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn faction(&self) -> Faction {
        self.faction
    }

    pub fn indicator(&self) -> PodIndicator {
        self.indicator
    }

    /// 準備タイマーの遅延（ミリ秒）
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// 準備タイマーを繰り返すか
    pub fn repeats(&self) -> bool {
        self.repeat
    }

    /// ユニットの足元位置
    pub fn unit_position(&self) -> Position3D {
        self.position + Position3D::new(0.0, 0.0, self.v_offset)
    }

    /// 出現位置でユニットが占める領域（向きは考慮しない）
    pub fn unit_bounds(&self) -> Aabb {
        self.collider.bounds_at(self.unit_position())
    }

    /// 出現位置が空いているか
    pub fn evaluate_free_space(&self, space: &dyn ISpaceQuery) -> bool {
        !space.overlap_box(&self.unit_bounds())
    }

    /// 空きがあればユニットを生成
    ///
    /// 表示状態は判定結果に合わせて Ready / Blocked に更新されます。
    pub fn spawn_unit(&mut self, space: &dyn ISpaceQuery, id: UnitId) -> Result<SpawnResult, UnitError> {
        if !self.evaluate_free_space(space) {
            self.indicator = PodIndicator::Blocked;
            warn!("スポナー {}: 出現位置が塞がっています", self.id);
            return Ok(SpawnResult::Blocked);
        }

        self.indicator = PodIndicator::Ready;
        let name = format!("{} {}", self.faction, self.template.id);
        let unit = Unit::spawn(id, name, &self.template, self.faction, self.unit_position(), self.facing)?;

        info!(
            "スポナー {}: {} ({}) を生成 @ ({:.1}, {:.1}, {:.1}) 向き {:.0}度",
            self.id,
            unit.name(),
            id,
            unit.position().x,
            unit.position().y,
            unit.position().z,
            unit.facing().heading_deg()
        );
        Ok(SpawnResult::Spawned(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        physics::{CollisionWorld, UnitCollider},
        test_support::{spawner_config, template},
        traits::IManaged,
    };

    struct Space {
        world: CollisionWorld,
        units: Vec<UnitCollider>,
    }

    impl ISpaceQuery for Space {
        fn overlap_box(&self, bounds: &Aabb) -> bool {
            self.world.overlap_box(bounds, &self.units)
        }
    }

    fn empty_space() -> Space {
        Space {
            world: CollisionWorld::default(),
            units: Vec::new(),
        }
    }

    #[test]
    fn test_spawn_in_free_space() {
        let mut spawner = UnitSpawner::new(&spawner_config("pod-a", Faction::Enemy), &template()).unwrap();

        let result = spawner.spawn_unit(&empty_space(), UnitId(7)).unwrap();
        let SpawnResult::Spawned(unit) = result else {
            panic!("expected a spawned unit");
        };

        assert_eq!(unit.id(), UnitId(7));
        assert_eq!(unit.unit_properties_manager().combat_stats().faction, Faction::Enemy);
        assert_eq!(unit.name(), "Enemy soldier");
        assert_eq!(spawner.indicator(), PodIndicator::Ready);
    }

    #[test]
    fn test_spawn_blocked_when_occupied() {
        let mut spawner = UnitSpawner::new(&spawner_config("pod-a", Faction::Player), &template()).unwrap();
        let occupant = template().collider_shape();
        let space = Space {
            world: CollisionWorld::default(),
            units: vec![UnitCollider {
                id: UnitId(1),
                base: spawner.unit_position(),
                shape: occupant,
            }],
        };

        let result = spawner.spawn_unit(&space, UnitId(2)).unwrap();
        assert!(matches!(result, SpawnResult::Blocked));
        assert_eq!(spawner.indicator(), PodIndicator::Blocked);

        let result = spawner.spawn_unit(&empty_space(), UnitId(2)).unwrap();
        assert!(matches!(result, SpawnResult::Spawned(_)));
        assert_eq!(spawner.indicator(), PodIndicator::Ready);
    }

    #[test]
    fn test_v_offset_lifts_unit() {
        let mut config = spawner_config("pod-a", Faction::Player);
        config.v_offset_m = 0.5;
        let spawner = UnitSpawner::new(&config, &template()).unwrap();

        assert_eq!(spawner.unit_position().z, config.position.z_m + 0.5);
        assert!((spawner.unit_bounds().center.z - (spawner.unit_position().z + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_zero_collider_rejected() {
        let mut bad = template();
        bad.collider.radius_m = 0.0;
        bad.collider.height_m = 0.0;

        let result = UnitSpawner::new(&spawner_config("pod-a", Faction::Player), &bad);
        assert!(matches!(result, Err(UnitError::Configuration(_))));
    }

    #[test]
    fn test_flat_collider_rejected_at_construction() {
        let mut flat = template();
        flat.collider.radius_m = 0.0;
        assert!(matches!(
            UnitSpawner::new(&spawner_config("pod-a", Faction::Player), &flat),
            Err(UnitError::Configuration(_))
        ));

        let mut thin = template();
        thin.collider.height_m = 0.0;
        assert!(matches!(
            UnitSpawner::new(&spawner_config("pod-a", Faction::Player), &thin),
            Err(UnitError::Configuration(_))
        ));
    }
}
