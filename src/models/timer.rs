//! # Timer モジュール
//!
//! シミュレーションのティックで駆動されるキャンセル可能なタイマーを提供します。
//!
//! 時刻はすべて整数ミリ秒で扱います。`RepeatingTimer` は単一の周期タスク、
//! `TimerWheel` はハンドルで管理される遅延・ループタスクの集合です。
//! どちらもホスト側のランタイムに依存せず、`advance` の呼び出しでのみ時間が進みます。

use std::collections::BTreeMap;
use std::fmt;

/// タイマー操作エラー
#[derive(Debug, Clone, PartialEq)]
pub enum TimerError {
    /// 遅延時間が0以下
    InvalidDelay(u64),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::InvalidDelay(ms) => {
                write!(f, "タイマーの遅延時間は0より大きくなければなりません: {}ms", ms)
            }
        }
    }
}

impl std::error::Error for TimerError {}

/// 周期タイマー
///
/// 停止中は `advance` しても発火しません。
/// `stop` は同期的で、呼び出し後に保留中の発火が残ることはありません。
#[derive(Debug, Clone, Default)]
pub struct RepeatingTimer {
    interval_ms: Option<u64>,
    elapsed_ms: u64,
}

impl RepeatingTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// タイマーを開始
    ///
    /// 既に動作中の場合は新しいタイマーを作らず、周期だけを更新します。
    /// 経過時間は新しい周期未満に丸めるので、再開直後にまとめて発火することはありません。
    pub fn start(&mut self, interval_ms: u64) -> Result<(), TimerError> {
        if interval_ms == 0 {
            return Err(TimerError::InvalidDelay(interval_ms));
        }
        match self.interval_ms {
            None => self.elapsed_ms = 0,
            Some(_) => self.elapsed_ms %= interval_ms,
        }
        self.interval_ms = Some(interval_ms);
        Ok(())
    }

    /// タイマーを停止（停止中に呼んでも何もしない）
    pub fn stop(&mut self) {
        self.interval_ms = None;
        self.elapsed_ms = 0;
    }

    /// 時間を進め、その間に発火した回数を返す
    pub fn advance(&mut self, dt_ms: u64) -> u32 {
        let Some(interval) = self.interval_ms else {
            return 0;
        };

        self.elapsed_ms += dt_ms;
        let fires = self.elapsed_ms / interval;
        self.elapsed_ms %= interval;
        fires as u32
    }
}

/// タイマーハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct TimerEntry<K> {
    key: K,
    delay_ms: u64,
    remaining_ms: u64,
    repeat: bool,
}

/// 遅延実行タスクの集合
///
/// 発火したタスクのキーを `advance` の戻り値として返すので、
/// 呼び出し側がキーに応じた処理をディスパッチします。
#[derive(Debug)]
pub struct TimerWheel<K> {
    entries: BTreeMap<TimerHandle, TimerEntry<K>>,
    next_handle: u64,
}

impl<K: Clone> TimerWheel<K> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_handle: 0,
        }
    }

    /// タイマーを開始
    ///
    /// # 引数
    ///
    /// * `key` - 発火時に返されるタスクキー
    /// * `delay_ms` - 発火までの遅延（ミリ秒）
    /// * `repeat` - trueの場合、キャンセルされるまで同じ周期で発火し続ける
    pub fn start(&mut self, key: K, delay_ms: u64, repeat: bool) -> Result<TimerHandle, TimerError> {
        if delay_ms == 0 {
            return Err(TimerError::InvalidDelay(delay_ms));
        }

        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.entries.insert(
            handle,
            TimerEntry {
                key,
                delay_ms,
                remaining_ms: delay_ms,
                repeat,
            },
        );
        Ok(handle)
    }

    /// タイマーをキャンセル
    ///
    /// # 戻り値
    ///
    /// 保留中のタイマーを取り消した場合はtrue（既に完了・取消済みならfalse）
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 時間を進め、発火したタスクをハンドル順に返す
    ///
    /// ループタイマーは1回の `advance` で複数回発火することがあります。
    pub fn advance(&mut self, dt_ms: u64) -> Vec<(TimerHandle, K)> {
        let mut fired = Vec::new();
        let mut finished = Vec::new();

        for (handle, entry) in self.entries.iter_mut() {
            let mut budget = dt_ms;
            while budget >= entry.remaining_ms {
                budget -= entry.remaining_ms;
                fired.push((*handle, entry.key.clone()));

                if !entry.repeat {
                    finished.push(*handle);
                    break;
                }
                entry.remaining_ms = entry.delay_ms;
            }
            if entry.repeat || !finished.contains(handle) {
                entry.remaining_ms -= budget.min(entry.remaining_ms);
            }
        }

        for handle in finished {
            self.entries.remove(&handle);
        }

        fired
    }
}

impl<K: Clone> Default for TimerWheel<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeating_timer_exact_fire_count() {
        let mut timer = RepeatingTimer::new();
        timer.start(100).unwrap();

        let fires: u32 = (0..100).map(|_| timer.advance(10)).sum();
        assert_eq!(fires, 10);
    }

    #[test]
    fn test_repeating_timer_restart_keeps_single_timer() {
        let mut timer = RepeatingTimer::new();
        timer.start(100).unwrap();
        timer.advance(50);
        timer.start(100).unwrap();

        assert_eq!(timer.advance(50), 1);
        assert_eq!(timer.advance(1000), 10);
    }

    #[test]
    fn test_repeating_timer_restart_with_shorter_interval() {
        let mut timer = RepeatingTimer::new();
        timer.start(1000).unwrap();
        assert_eq!(timer.advance(900), 0);

        timer.start(100).unwrap();
        assert_eq!(timer.advance(20), 0);
        assert_eq!(timer.advance(80), 1);
        assert_eq!(timer.advance(1000), 10);
    }

    #[test]
    fn test_repeating_timer_restart_with_longer_interval() {
        let mut timer = RepeatingTimer::new();
        timer.start(100).unwrap();
        timer.advance(60);

        timer.start(1000).unwrap();
        assert_eq!(timer.advance(900), 0);
        assert_eq!(timer.advance(40), 1);
    }

    #[test]
    fn test_repeating_timer_stop_is_immediate() {
        let mut timer = RepeatingTimer::new();
        timer.start(100).unwrap();
        timer.stop();
        timer.stop();

        assert_eq!(timer.advance(10_000), 0);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut timer = RepeatingTimer::new();
        assert_eq!(timer.start(0), Err(TimerError::InvalidDelay(0)));

        let mut wheel: TimerWheel<&str> = TimerWheel::new();
        assert!(wheel.start("despawn", 0, false).is_err());
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut wheel = TimerWheel::new();
        let handle = wheel.start("despawn", 1000, false).unwrap();

        assert!(wheel.advance(999).is_empty());
        assert_eq!(wheel.advance(1), vec![(handle, "despawn")]);
        assert!(wheel.advance(5000).is_empty());
        assert!(!wheel.cancel(handle));
    }

    #[test]
    fn test_looping_timer_fires_until_cancelled() {
        let mut wheel = TimerWheel::new();
        let handle = wheel.start("spawn", 500, true).unwrap();

        assert_eq!(wheel.advance(1200).len(), 2);
        assert_eq!(wheel.advance(300).len(), 1);
        assert!(wheel.cancel(handle));
        assert!(!wheel.cancel(handle));
        assert!(wheel.advance(5000).is_empty());
    }
}
