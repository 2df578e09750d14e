use std::fmt;

use crate::models::timer::TimerError;

/// ユニット構成・操作のエラー
#[derive(Debug, Clone, PartialEq)]
pub enum UnitError {
    /// 構成エラー（テンプレートの欠落、コライダー寸法0など）。再試行しない。
    Configuration(String),
    /// 不正な操作（0以下の周期でのポーリング開始など）
    InvalidOperation(String),
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitError::Configuration(msg) => write!(f, "ユニット構成エラー: {}", msg),
            UnitError::InvalidOperation(msg) => write!(f, "不正な操作: {}", msg),
        }
    }
}

impl std::error::Error for UnitError {}

impl From<TimerError> for UnitError {
    fn from(err: TimerError) -> Self {
        UnitError::InvalidOperation(err.to_string())
    }
}
