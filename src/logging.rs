//! # Logging モジュール
//!
//! ユニット戦闘シミュレーションのログ管理機能を提供します。
//!
//! tracing-appenderによる非ブロッキングのファイル出力と、コンソール出力を
//! 組み合わせて初期化します。ドメイン側は `tracing` のマクロでログを出すだけで、
//! 出力先やフォーマットはここで一元的に決まります。
//!
//! ## レベルの使い分け
//!
//! - `info`: ユニットの生成・死亡・除去などのライフサイクル
//! - `debug`: 状態遷移と攻撃
//! - `trace`: ポーリングのティック
//! - `warn`: スポーン失敗
//!
//! ## 設定可能な出力先
//!
//! - `Console`: コンソールのみ
//! - `File`: ファイルのみ（logs/unitsim.YYYY-MM-DD、JSON形式）
//! - `Both`: コンソールとファイルの両方

use std::str::FromStr;
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    /// コンソールのみ
    Console,
    /// ファイルのみ
    File,
    /// コンソールとファイルの両方
    Both,
}

impl LogOutput {
    pub fn writes_file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(format!("無効な出力先: {}. 利用可能: console, file, both", s)),
        }
    }
}

/// ログ設定構造体
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub output: LogOutput,
    /// ログファイルのディレクトリ（File または Both の場合）
    pub log_dir: String,
    /// ログファイル名のプレフィックス
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            log_dir: "logs".to_string(),
            file_prefix: "unitsim".to_string(),
        }
    }
}

/// ログシステムを初期化
///
/// `RUST_LOG` が設定されていればそちらを優先します。
///
/// # 戻り値
///
/// ファイル出力を行う場合は書き込みスレッドのガード。
/// ガードを破棄すると未書き込みのログがフラッシュされるため、`main` の終わりまで保持してください。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.output {
        LogOutput::Console => {
            Registry::default()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .try_init()?;
            Ok(None)
        }
        LogOutput::File => {
            ensure_log_directory(&config.log_dir)?;
            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (writer, guard) = non_blocking(file_appender);

            Registry::default()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .json(),
                )
                .try_init()?;
            Ok(Some(guard))
        }
        LogOutput::Both => {
            ensure_log_directory(&config.log_dir)?;
            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (writer, guard) = non_blocking(file_appender);

            Registry::default()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .json(),
                )
                .try_init()?;
            Ok(Some(guard))
        }
    }
}

/// ログレベルを文字列から解析
///
/// # 引数
///
/// * `level_str` - ログレベル文字列 ("trace", "debug", "info", "warn", "error")
///
/// # 戻り値
///
/// 解析されたログレベル、無効な場合はINFO
pub fn parse_log_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("警告: 無効なログレベル '{}'. INFOを使用します", level_str);
            Level::INFO
        }
    }
}

/// 詳細出力レベル（-v の数）からログレベルを決める
pub fn level_for_verbosity(verbose_level: u8) -> Level {
    match verbose_level {
        0 => Level::INFO,
        1 | 2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// ログディレクトリを作成（既に存在する場合は何もしない）
pub fn ensure_log_directory(log_dir: &str) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_output_from_str() {
        assert_eq!(LogOutput::from_str("console"), Ok(LogOutput::Console));
        assert_eq!(LogOutput::from_str("file"), Ok(LogOutput::File));
        assert_eq!(LogOutput::from_str("both"), Ok(LogOutput::Both));
        assert!(LogOutput::from_str("invalid").is_err());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level("INFO"), Level::INFO);
        assert_eq!(parse_log_level("invalid"), Level::INFO);
    }

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), Level::INFO);
        assert_eq!(level_for_verbosity(2), Level::DEBUG);
        assert_eq!(level_for_verbosity(5), Level::TRACE);
    }

    #[test]
    fn test_init_logging_both_outputs() {
        let log_dir = std::env::temp_dir().join("unitsim-logging-test");
        let config = LogConfig {
            level: Level::DEBUG,
            output: LogOutput::Both,
            log_dir: log_dir.to_string_lossy().into_owned(),
            file_prefix: "unitsim-test".to_string(),
        };

        let guard = init_logging(&config).unwrap();
        assert!(guard.is_some());
        assert!(log_dir.is_dir());

        // グローバルなサブスクライバーは一度しか設定できない
        assert!(init_logging(&LogConfig::default()).is_err());
    }

    #[test]
    fn test_writes_file() {
        assert!(!LogOutput::Console.writes_file());
        assert!(LogOutput::File.writes_file());
        assert!(LogOutput::Both.writes_file());
    }
}
