use crate::models::{
    combat_stats::CombatStats,
    common::{Direction3D, Position3D, UnitId},
    physics::{Aabb, CollisionWorld, RaycastHit, UnitCollider},
    traits::{ICombatantLookup, IManaged, IRaycaster, ISpaceQuery},
    unit::UnitRoster,
};

/// ある時点のシーンの読み取り専用ビュー
///
/// 静的障害物と全ユニットのコライダーをまとめ、物理問い合わせに答えます。
/// 死亡演出中のユニットも除去されるまではコライダーを持ちます。
pub struct SceneView<'a> {
    world: &'a CollisionWorld,
    units: &'a UnitRoster,
    colliders: Vec<UnitCollider>,
}

impl<'a> SceneView<'a> {
    pub fn new(world: &'a CollisionWorld, units: &'a UnitRoster) -> Self {
        let colliders = units.values().map(|u| u.collider()).collect();
        Self { world, units, colliders }
    }
}

impl IRaycaster for SceneView<'_> {
    fn raycast(
        &self,
        origin: Position3D,
        direction: Direction3D,
        max_distance: f64,
        ignore: Option<UnitId>,
    ) -> RaycastHit {
        self.world
            .raycast(origin, direction, max_distance, &self.colliders, ignore)
    }
}

impl ISpaceQuery for SceneView<'_> {
    fn overlap_box(&self, bounds: &Aabb) -> bool {
        self.world.overlap_box(bounds, &self.colliders)
    }
}

impl ICombatantLookup for SceneView<'_> {
    fn combat_stats(&self, id: UnitId) -> Option<&CombatStats> {
        self.units
            .get(&id)
            .map(|u| u.unit_properties_manager().combat_stats())
    }
}
