use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::models::{
    combat_stats::CombatStatsTemplate,
    common::{self, Faction, time_utils},
    physics::{Aabb, CapsuleShape, StaticObstacle},
    states::WalkState,
};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// 時間刻み（ミリ秒）
    pub dt_ms: u64,
    pub t_max_s: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct Position3D {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

impl Position3D {
    pub fn to_position(&self) -> common::Position3D {
        common::Position3D::new(self.x_m, self.y_m, self.z_m)
    }
}

/// 静的障害物の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObstacleConfig {
    pub id: String,
    pub center: Position3D,
    pub half_extents: Position3D,
}

impl ObstacleConfig {
    pub fn to_obstacle(&self) -> StaticObstacle {
        StaticObstacle {
            id: self.id.clone(),
            bounds: Aabb::new(self.center.to_position(), self.half_extents.to_position()),
        }
    }
}

/// 世界設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
}

/// カプセルコライダーの寸法
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColliderConfig {
    pub radius_m: f64,
    pub height_m: f64,
}

/// ユニットテンプレート（スポーン時に複製される）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitTemplateConfig {
    pub id: String,
    pub walk_speed_mps: f64,
    /// 前方検知のレイ長
    pub detector_distance_m: f64,
    pub collider: ColliderConfig,
    pub combat: CombatStatsTemplate,
}

impl UnitTemplateConfig {
    pub fn collider_shape(&self) -> CapsuleShape {
        CapsuleShape {
            radius: self.collider.radius_m,
            height: self.collider.height_m,
        }
    }
}

/// スポナーの準備タイマー
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpawnTimerConfig {
    pub delay_ms: u64,
    #[serde(rename = "loop", default)]
    pub repeat: bool,
}

/// スポナーポッド設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpawnerConfig {
    pub id: String,
    pub template: String,
    pub faction: Faction,
    pub position: Position3D,
    /// 向き（度、+X軸から反時計回り）
    #[serde(default)]
    pub facing_deg: f64,
    #[serde(default)]
    pub v_offset_m: f64,
    pub timer: SpawnTimerConfig,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    #[serde(default)]
    pub world: WorldConfig,
    pub unit_templates: Vec<UnitTemplateConfig>,
    pub spawners: Vec<SpawnerConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// テンプレートIDから検索
    pub fn template(&self, id: &str) -> Option<&UnitTemplateConfig> {
        self.unit_templates.iter().find(|t| t.id == id)
    }

    /// 設定の検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.dt_ms == 0 {
            return Err(ScenarioError::ValidationError("dt_ms must be positive".to_string()));
        }
        // 1ティックの移動が歩行ポーリング1周期分を超えないようにする
        let max_dt_ms = time_utils::seconds_to_ms(WalkState::POLL_INTERVAL_S);
        if self.sim.dt_ms > max_dt_ms {
            return Err(ScenarioError::ValidationError(format!(
                "dt_ms must not exceed the walking poll interval ({}ms): {}",
                max_dt_ms, self.sim.dt_ms
            )));
        }
        if !(self.sim.t_max_s > 0.0) {
            return Err(ScenarioError::ValidationError("t_max_s must be positive".to_string()));
        }

        let mut obstacle_ids = HashSet::new();
        for obstacle in &self.world.obstacles {
            if !obstacle_ids.insert(obstacle.id.as_str()) {
                return Err(ScenarioError::ValidationError(format!(
                    "Duplicate obstacle id: {}",
                    obstacle.id
                )));
            }
            if obstacle.to_obstacle().bounds.is_degenerate() {
                return Err(ScenarioError::ValidationError(format!(
                    "Obstacle {} has zero extents",
                    obstacle.id
                )));
            }
        }

        let mut template_ids = HashSet::new();
        for template in &self.unit_templates {
            if !template_ids.insert(template.id.as_str()) {
                return Err(ScenarioError::ValidationError(format!(
                    "Duplicate unit template id: {}",
                    template.id
                )));
            }
            if !(template.detector_distance_m > 0.0) {
                return Err(ScenarioError::ValidationError(format!(
                    "Template {}: detector_distance_m must be positive",
                    template.id
                )));
            }
            if !template.collider_shape().is_valid() {
                return Err(ScenarioError::ValidationError(format!(
                    "Template {}: collider dimensions must be positive",
                    template.id
                )));
            }
            if !(template.walk_speed_mps >= 0.0) {
                return Err(ScenarioError::ValidationError(format!(
                    "Template {}: walk_speed_mps must be non-negative",
                    template.id
                )));
            }
            template
                .combat
                .validate()
                .map_err(|e| ScenarioError::ValidationError(format!("Template {}: {}", template.id, e)))?;
        }

        let mut spawner_ids = HashSet::new();
        for spawner in &self.spawners {
            if !spawner_ids.insert(spawner.id.as_str()) {
                return Err(ScenarioError::ValidationError(format!(
                    "Duplicate spawner id: {}",
                    spawner.id
                )));
            }
            if !template_ids.contains(spawner.template.as_str()) {
                return Err(ScenarioError::ValidationError(format!(
                    "Spawner {} references unknown template {}",
                    spawner.id, spawner.template
                )));
            }
            if spawner.timer.delay_ms == 0 {
                return Err(ScenarioError::ValidationError(format!(
                    "Spawner {}: timer delay_ms must be positive",
                    spawner.id
                )));
            }
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {}ミリ秒", self.sim.dt_ms);
        println!("最大時間: {:.1}秒 ({:.1}分)", self.sim.t_max_s, self.sim.t_max_s / 60.0);
        println!();

        println!("=== 世界 ===");
        println!("静的障害物: {}個", self.world.obstacles.len());
        println!();

        println!("=== ユニットテンプレート ===");
        for template in &self.unit_templates {
            let combat = &template.combat;
            println!(
                "  {} ({:?}): 体力 {:.0} / 攻撃力 {:.0} / 防御力 {:.0} / 攻撃速度 {:.2}回/秒 / 歩行 {:.1}m/s",
                template.id,
                combat.combat_style,
                combat.max_health,
                combat.attack_damage,
                combat.defense,
                combat.attack_speed,
                template.walk_speed_mps
            );
        }
        println!();

        println!("=== スポナー ===");
        for faction in [Faction::Player, Faction::Enemy] {
            let count = self.spawners.iter().filter(|s| s.faction == faction).count();
            println!("{}: {}基", faction, count);
        }
        for spawner in &self.spawners {
            println!(
                "  {}: {} ({}) 遅延 {}ms{}",
                spawner.id,
                spawner.template,
                spawner.faction,
                spawner.timer.delay_ms,
                if spawner.timer.repeat { " 繰り返し" } else { "" }
            );
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}
