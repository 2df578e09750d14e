// 基本的なデータ型と数学ユーティリティ
pub mod common;
pub mod errors;

// イベント購読とタイマー
pub mod observer;
pub mod timer;

// 衝突ワールドとユニットから見たインターフェース（trait）定義
pub mod physics;
pub mod scene;
pub mod traits;

// ユニットのサブコンポーネント
pub mod animator;
pub mod combat_manager;
pub mod combat_stats;
pub mod obstacle_detector;
pub mod spatial_detector;
pub mod unit_properties;

// ユニット本体、状態機械、スポナー
pub mod spawner;
pub mod states;
pub mod unit;

#[cfg(test)]
pub mod test_support;

// シミュレーションエンジンから使う型の re-export
pub use common::*;
pub use errors::UnitError;
pub use traits::*;
pub use combat_manager::{AttackOutcome, handle_attack};
pub use combat_stats::DamageOutcome;
pub use obstacle_detector::{ObstacleDetector, ObstacleType};
pub use physics::CollisionWorld;
pub use scene::SceneView;
pub use spatial_detector::DetectionResult;
pub use spawner::{PodIndicator, SpawnResult, UnitSpawner};
pub use states::StateAction;
pub use timer::{TimerHandle, TimerWheel};
pub use unit::UnitRoster;
