use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// 3次元位置を表す構造体
///
/// 地表面をXY平面、Zを高さとして扱います。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position3D {
    pub x: f64, // m
    pub y: f64, // m
    pub z: f64, // m (height)
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl Add for Position3D {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Position3D {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// 正規化された3次元方向ベクトル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Direction3D {
    /// XY平面上の方位角（度、+X軸が0度、反時計回り）から水平方向を作成
    pub fn from_heading_deg(heading_deg: f64) -> Self {
        let rad = math_utils::deg_to_rad(heading_deg);
        Self { x: rad.cos(), y: rad.sin(), z: 0.0 }
    }

    /// XY平面での方位角（度）
    pub fn heading_deg(&self) -> f64 {
        math_utils::normalize_angle(self.y.atan2(self.x).to_degrees())
    }
}

impl Default for Direction3D {
    fn default() -> Self {
        Self { x: 1.0, y: 0.0, z: 0.0 }
    }
}

/// 3次元速度を表す構造体
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity3D {
    pub x: f64, // m/s
    pub y: f64, // m/s
    pub z: f64, // m/s
}

impl Velocity3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 方向と速さから速度ベクトルを作成
    pub fn along(direction: Direction3D, speed: f64) -> Self {
        Self::new(direction.x * speed, direction.y * speed, direction.z * speed)
    }

    /// dt秒間の変位
    pub fn displacement(&self, dt: f64) -> Position3D {
        Position3D::new(self.x * dt, self.y * dt, self.z * dt)
    }
}

/// ユニットの一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U{:04}", self.0)
    }
}

/// 陣営
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Faction {
    Player,
    Enemy,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Player => write!(f, "Player"),
            Faction::Enemy => write!(f, "Enemy"),
        }
    }
}

/// 戦闘スタイル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum CombatStyle {
    #[default]
    Melee,
    Ranged,
}

/// 時間変換ユーティリティ
///
/// シミュレーション内部の時刻はすべて整数ミリ秒で扱い、
/// 浮動小数点の累積誤差でタイマーの発火回数がずれないようにします。
pub mod time_utils {
    /// 秒をミリ秒に変換（四捨五入）
    pub fn seconds_to_ms(seconds: f64) -> u64 {
        if seconds.is_finite() && seconds > 0.0 {
            (seconds * 1000.0).round() as u64
        } else {
            0
        }
    }

    /// ミリ秒を秒に変換
    pub fn ms_to_seconds(ms: u64) -> f64 {
        ms as f64 / 1000.0
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// 角度を-180度〜180度の範囲に正規化
    pub fn normalize_angle(angle_deg: f64) -> f64 {
        let mut normalized = angle_deg % 360.0;
        if normalized > 180.0 {
            normalized -= 360.0;
        } else if normalized <= -180.0 {
            normalized += 360.0;
        }
        normalized
    }
}
