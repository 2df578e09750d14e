use crate::models::{
    animator::Animator,
    combat_stats::CombatStats,
    common::{Direction3D, Position3D, UnitId},
    physics::{Aabb, RaycastHit},
    spatial_detector::SpatialDetector,
    unit_properties::UnitPropertiesManager,
};

/// レイキャストを提供する物理サービスのインターフェース
pub trait IRaycaster {
    /// 最も近いコライダーへのレイキャスト
    fn raycast(
        &self,
        origin: Position3D,
        direction: Direction3D,
        max_distance: f64,
        ignore: Option<UnitId>,
    ) -> RaycastHit;
}

/// 空間占有判定のインターフェース（スポナーが使用）
pub trait ISpaceQuery {
    /// ボックス領域が何かと重なっている場合true
    fn overlap_box(&self, bounds: &Aabb) -> bool;
}

/// 戦闘可能なコンポーネントの参照を解決するインターフェース
pub trait ICombatantLookup {
    /// ユニットの戦闘ステータス（戦闘能力を持たない、または存在しない場合はNone）
    fn combat_stats(&self, id: UnitId) -> Option<&CombatStats>;
}

/// 状態ビヘイビアやサブコンポーネントから見たユニットの能力セット
pub trait IManaged {
    fn unit_id(&self) -> UnitId;

    fn unit_properties_manager(&self) -> &UnitPropertiesManager;

    fn animator(&self) -> &Animator;

    fn spatial_detector(&self) -> &SpatialDetector;

    /// コライダー中心（レイの始点）
    fn collider_center(&self) -> Position3D;
}
