//! # Physics モジュール
//!
//! ユニットの判断ロジックが前提とする最小限の衝突ワールドを提供します。
//!
//! 静的障害物は軸平行ボックス（AABB）、ユニットは垂直カプセル（円柱で近似）として扱い、
//! レイキャストとボックス重なり判定の2種類のクエリのみをサポートします。
//! 物理応答（押し戻し、重力など）は扱いません。

use crate::models::common::{Direction3D, Position3D, UnitId};

const EPSILON: f64 = 1e-12;

/// 軸平行ボックス
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Position3D,
    pub half_extents: Position3D,
}

impl Aabb {
    pub fn new(center: Position3D, half_extents: Position3D) -> Self {
        Self { center, half_extents }
    }

    pub fn min(&self) -> Position3D {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Position3D {
        self.center + self.half_extents
    }

    /// 寸法がすべて0の場合true
    pub fn is_degenerate(&self) -> bool {
        self.half_extents.x <= 0.0 && self.half_extents.y <= 0.0 && self.half_extents.z <= 0.0
    }

    /// 他のボックスと重なっているか（接触のみは重なりとみなさない）
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && a_max.x > b_min.x
            && a_min.y < b_max.y && a_max.y > b_min.y
            && a_min.z < b_max.z && a_max.z > b_min.z
    }
}

/// 垂直カプセル形状（足元基準）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleShape {
    pub radius: f64,
    pub height: f64,
}

impl CapsuleShape {
    /// 半径と高さがともに正の有限値か
    pub fn is_valid(&self) -> bool {
        self.radius.is_finite() && self.radius > 0.0 && self.height.is_finite() && self.height > 0.0
    }

    /// 足元位置から見たコライダー中心
    pub fn center_from_base(&self, base: Position3D) -> Position3D {
        Position3D::new(base.x, base.y, base.z + self.height * 0.5)
    }

    /// カプセルを包むボックスの半寸法
    pub fn extents(&self) -> Position3D {
        Position3D::new(self.radius, self.radius, self.height * 0.5)
    }

    /// 足元位置に置いたときの包含ボックス
    pub fn bounds_at(&self, base: Position3D) -> Aabb {
        Aabb::new(self.center_from_base(base), self.extents())
    }
}

/// クエリ対象となるユニットのコライダー
#[derive(Debug, Clone, Copy)]
pub struct UnitCollider {
    pub id: UnitId,
    pub base: Position3D,
    pub shape: CapsuleShape,
}

/// 静的障害物
#[derive(Debug, Clone)]
pub struct StaticObstacle {
    pub id: String,
    pub bounds: Aabb,
}

/// レイが当たったコライダー
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderRef {
    Unit(UnitId),
    Static(String),
}

/// レイキャスト結果
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastHit {
    /// 何にも当たらなかった場合はNone
    pub collider: Option<ColliderRef>,
    pub distance: f64,
}

impl RaycastHit {
    pub fn miss() -> Self {
        Self {
            collider: None,
            distance: 0.0,
        }
    }
}

/// 静的障害物を保持する衝突ワールド
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    pub obstacles: Vec<StaticObstacle>,
}

impl CollisionWorld {
    pub fn new(obstacles: Vec<StaticObstacle>) -> Self {
        Self { obstacles }
    }

    /// 最も近いコライダーへのレイキャスト
    ///
    /// # 引数
    ///
    /// * `origin` - レイの始点
    /// * `direction` - レイの方向
    /// * `max_distance` - 最大距離（メートル）
    /// * `units` - 判定対象のユニットコライダー
    /// * `ignore` - 判定から除外するユニット（レイを撃つ本人）
    pub fn raycast(
        &self,
        origin: Position3D,
        direction: Direction3D,
        max_distance: f64,
        units: &[UnitCollider],
        ignore: Option<UnitId>,
    ) -> RaycastHit {
        let mut closest: Option<(f64, ColliderRef)> = None;

        let mut consider = |distance: f64, collider: ColliderRef| {
            if closest.as_ref().is_none_or(|(best, _)| distance < *best) {
                closest = Some((distance, collider));
            }
        };

        for obstacle in &self.obstacles {
            if let Some(distance) = ray_vs_aabb(origin, direction, max_distance, &obstacle.bounds) {
                consider(distance, ColliderRef::Static(obstacle.id.clone()));
            }
        }

        for unit in units {
            if Some(unit.id) == ignore {
                continue;
            }
            if let Some(distance) = ray_vs_capsule(origin, direction, max_distance, unit.base, unit.shape) {
                consider(distance, ColliderRef::Unit(unit.id));
            }
        }

        match closest {
            Some((distance, collider)) => RaycastHit {
                collider: Some(collider),
                distance,
            },
            None => RaycastHit::miss(),
        }
    }

    /// ボックス領域が何かと重なっているか
    pub fn overlap_box(&self, bounds: &Aabb, units: &[UnitCollider]) -> bool {
        self.obstacles.iter().any(|o| o.bounds.overlaps(bounds))
            || units.iter().any(|u| u.shape.bounds_at(u.base).overlaps(bounds))
    }
}

/// 1軸のスラブとの交差区間
fn slab(origin: f64, dir: f64, min: f64, max: f64) -> Option<(f64, f64)> {
    if dir.abs() < EPSILON {
        if origin < min || origin > max {
            None
        } else {
            Some((f64::NEG_INFINITY, f64::INFINITY))
        }
    } else {
        let t1 = (min - origin) / dir;
        let t2 = (max - origin) / dir;
        Some((t1.min(t2), t1.max(t2)))
    }
}

fn clip(t_enter: f64, t_exit: f64, max_distance: f64) -> Option<f64> {
    let t0 = t_enter.max(0.0);
    let t1 = t_exit.min(max_distance);
    if t0 <= t1 { Some(t0) } else { None }
}

pub fn ray_vs_aabb(origin: Position3D, direction: Direction3D, max_distance: f64, aabb: &Aabb) -> Option<f64> {
    let (min, max) = (aabb.min(), aabb.max());
    let (x0, x1) = slab(origin.x, direction.x, min.x, max.x)?;
    let (y0, y1) = slab(origin.y, direction.y, min.y, max.y)?;
    let (z0, z1) = slab(origin.z, direction.z, min.z, max.z)?;

    clip(x0.max(y0).max(z0), x1.min(y1).min(z1), max_distance)
}

pub fn ray_vs_capsule(
    origin: Position3D,
    direction: Direction3D,
    max_distance: f64,
    base: Position3D,
    shape: CapsuleShape,
) -> Option<f64> {
    let ox = origin.x - base.x;
    let oy = origin.y - base.y;
    let a = direction.x * direction.x + direction.y * direction.y;
    let c = ox * ox + oy * oy - shape.radius * shape.radius;

    let (r0, r1) = if a < EPSILON {
        if c > 0.0 {
            return None;
        }
        (f64::NEG_INFINITY, f64::INFINITY)
    } else {
        let b = ox * direction.x + oy * direction.y;
        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        ((-b - root) / a, (-b + root) / a)
    };

    let (z0, z1) = slab(origin.z, direction.z, base.z, base.z + shape.height)?;
    clip(r0.max(z0), r1.min(z1), max_distance)
}
