use crate::models::{
    spatial_detector::DetectionResult,
    traits::{ICombatantLookup, IManaged},
};

/// 前方の障害物の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleType {
    None,
    Friendly,
    Obstacle,
    Enemy,
}

/// 前方の検知結果を障害物の種類に分類するサブコンポーネント
///
/// 状態を持たない純粋な分類で、所有ユニットの陣営のみを参照します。
pub struct ObstacleDetector<'a> {
    owner: &'a dyn IManaged,
}

impl<'a> ObstacleDetector<'a> {
    pub fn new(owner: &'a dyn IManaged) -> Self {
        Self { owner }
    }

    /// 検知結果を分類
    ///
    /// 1. 何にも当たっていなければ `None`
    /// 2. 戦闘ステータスを持たない相手なら `Obstacle`
    /// 3. 死亡している相手も `Obstacle`
    /// 4. 同じ陣営なら `Friendly`、異なる陣営なら `Enemy`
    pub fn check_obstacle(&self, hit: &DetectionResult, lookup: &dyn ICombatantLookup) -> ObstacleType {
        if !hit.has_hit {
            return ObstacleType::None;
        }

        let Some(other) = hit.hit_entity_id.and_then(|id| lookup.combat_stats(id)) else {
            return ObstacleType::Obstacle;
        };

        if other.is_dead() {
            return ObstacleType::Obstacle;
        }

        let own_faction = self.owner.unit_properties_manager().combat_stats().faction;
        if other.faction == own_faction {
            ObstacleType::Friendly
        } else {
            ObstacleType::Enemy
        }
    }
}
