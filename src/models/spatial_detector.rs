use crate::models::{
    common::{Direction3D, Position3D, UnitId, time_utils},
    errors::UnitError,
    physics::{ColliderRef, RaycastHit},
    states::UnitAnimationState,
    timer::RepeatingTimer,
    traits::IRaycaster,
};
use tracing::trace;

/// 前方レイキャストの結果（ポーリング1回ごとに生成される）
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// 何かに当たったか
    pub has_hit: bool,
    /// 当たったのがユニットの場合、そのID（静的障害物ならNone）
    pub hit_entity_id: Option<UnitId>,
    /// 当たった位置までの距離（メートル）
    pub distance: f64,
}

impl DetectionResult {
    pub fn none() -> Self {
        Self {
            has_hit: false,
            hit_entity_id: None,
            distance: 0.0,
        }
    }
}

impl From<RaycastHit> for DetectionResult {
    fn from(hit: RaycastHit) -> Self {
        match hit.collider {
            None => DetectionResult::none(),
            Some(ColliderRef::Unit(id)) => DetectionResult {
                has_hit: true,
                hit_entity_id: Some(id),
                distance: hit.distance,
            },
            Some(ColliderRef::Static(_)) => DetectionResult {
                has_hit: true,
                hit_entity_id: None,
                distance: hit.distance,
            },
        }
    }
}

/// ユニット前方の空間検知器
///
/// 一定周期で前方へレイを撃ち、結果を登録された状態ビヘイビアへ配送します。
/// ユニット本体は所有せず、レイの始点は呼び出し側が渡します。
/// 前方方向はポーリング開始時に確定し、ティックごとには再計算しません。
#[derive(Debug, Clone)]
pub struct SpatialDetector {
    /// レイの最大距離（メートル）
    distance: f64,
    /// ポーリング開始時に記録した前方方向
    forward: Direction3D,
    timer: RepeatingTimer,
    listeners: Vec<UnitAnimationState>,
    last_result: Option<DetectionResult>,
}

impl SpatialDetector {
    pub fn new(distance: f64, forward: Direction3D) -> Result<Self, UnitError> {
        if !(distance.is_finite() && distance > 0.0) {
            return Err(UnitError::Configuration(format!(
                "detector distance must be positive: {}",
                distance
            )));
        }

        Ok(Self {
            distance,
            forward,
            timer: RepeatingTimer::new(),
            listeners: Vec::new(),
            last_result: None,
        })
    }

    /// 前方へ1本レイを撃つ（同期処理）
    ///
    /// # 引数
    ///
    /// * `origin` - 所有ユニットのコライダー中心
    /// * `raycaster` - 物理サービス
    /// * `owner` - 所有ユニット（自身のコライダーは判定から除外）
    pub fn check_obstacle_forward(
        &self,
        origin: Position3D,
        raycaster: &dyn IRaycaster,
        owner: UnitId,
    ) -> DetectionResult {
        raycaster
            .raycast(origin, self.forward, self.distance, Some(owner))
            .into()
    }

    /// 最新の検知結果を記録
    pub fn record_result(&mut self, result: DetectionResult) {
        self.last_result = Some(result);
    }

    /// 直近の検知で前方に何もなかった場合true（ポーリング停止中は結果を持たない）
    pub fn can_move_forward(&self) -> bool {
        self.last_result.as_ref().is_none_or(|r| !r.has_hit)
    }

    /// 周期ポーリングを開始
    ///
    /// 既に動作中の場合はタイマーを増やさず、リスナーを置き換えて周期を更新します。
    ///
    /// # 引数
    ///
    /// * `listener` - 結果の配送先となる状態
    /// * `interval_s` - ポーリング周期（秒、正の値）
    /// * `forward` - 現在のユニット前方方向（ここで確定される）
    pub fn start_checking_on_interval(
        &mut self,
        listener: UnitAnimationState,
        interval_s: f64,
        forward: Direction3D,
    ) -> Result<(), UnitError> {
        let interval_ms = time_utils::seconds_to_ms(interval_s);
        if interval_ms == 0 {
            return Err(UnitError::InvalidOperation(format!(
                "polling interval must be positive: {}s",
                interval_s
            )));
        }

        self.timer.start(interval_ms)?;
        self.listeners.clear();
        self.listeners.push(listener);
        self.forward = forward;

        trace!("ポーリング開始: {:?} ({}ms)", listener, interval_ms);
        Ok(())
    }

    /// 周期ポーリングを停止
    ///
    /// リスナーを指定した場合はそのリスナーのみを解除し、残りがなければタイマーも止めます。
    /// 指定しない場合はタイマーと全リスナーを解除します。停止中に呼んでも何もしません。
    /// タイマーが止まると直近の検知結果も破棄します。
    pub fn stop_checking(&mut self, listener: Option<UnitAnimationState>) {
        if let Some(listener) = listener {
            self.listeners.retain(|l| *l != listener);
        } else {
            self.listeners.clear();
        }

        if self.listeners.is_empty() {
            self.timer.stop();
            self.last_result = None;
        }
    }

    pub fn listeners(&self) -> &[UnitAnimationState] {
        &self.listeners
    }

    /// 時間を進め、このティックで行うべきチェック回数を返す
    pub fn advance(&mut self, dt_ms: u64) -> u32 {
        self.timer.advance(dt_ms)
    }
}
