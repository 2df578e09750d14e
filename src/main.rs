mod logging;
mod models;
mod scenario;
mod simulation;

use std::time::Duration;

use clap::{Arg, ArgMatches, Command};
use logging::{LogConfig, LogOutput, init_logging, level_for_verbosity, parse_log_level};
use scenario::ScenarioConfig;
use simulation::{SimulationEngine, SimulationReport};
use tokio::time::MissedTickBehavior;

/// 組み込みデモ（-t）で使う1対1の決闘シナリオ
const DUEL_SCENARIO: &str = include_str!("../scenarios/duel.yaml");

fn main() {
    let matches = Command::new("unitsim")
        .version("0.1.0")
        .about("ユニット戦闘シミュレーション (Unit Combat Simulation)")
        .long_about("スポナーから出現したユニットが前方を検知しながら前進し、\n\
                     敵と接触すると戦闘する、固定時間刻みのシミュレーションです。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("test")
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みの決闘デモを実行")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("realtime")
                .long("realtime")
                .action(clap::ArgAction::SetTrue)
                .help("時間刻みを実時間に合わせて実行")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let logging_config = log_config(&matches, verbose_level);

    // ガードはmainの終わりまで保持する
    let _log_guard = match init_logging(&logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    println!("ユニット戦闘シミュレーション - unitsim v0.1.0");
    println!();

    if verbose_level > 0 {
        println!("詳細出力レベル: {}", verbose_level);
        if logging_config.output.writes_file() {
            println!("ログファイル: {}/{}.*", logging_config.log_dir, logging_config.file_prefix);
        }
    }

    let realtime = matches.get_flag("realtime");

    let result = if matches.get_flag("test") {
        println!("=== 決闘デモモード ===");
        run_demo(verbose_level, realtime)
    } else if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        run_scenario(scenario_path, matches.get_flag("info"), verbose_level, realtime)
    } else {
        show_default_help();
        Ok(())
    };

    match result {
        Ok(()) => {
            if verbose_level > 0 {
                println!("シナリオ実行が正常に完了しました。");
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}

/// コマンドライン引数からログ設定を作成
fn log_config(matches: &ArgMatches, verbose_level: u8) -> LogConfig {
    let level = match matches.get_one::<String>("log-level") {
        Some(level) => parse_log_level(level),
        None => level_for_verbosity(verbose_level),
    };
    let output = matches
        .get_one::<LogOutput>("log-output")
        .copied()
        .unwrap_or(LogOutput::Console);

    LogConfig {
        level,
        output,
        ..LogConfig::default()
    }
}

/// 組み込みの決闘シナリオを実行
fn run_demo(verbose_level: u8, realtime: bool) -> Result<(), Box<dyn std::error::Error>> {
    let scenario: ScenarioConfig = serde_yaml::from_str(DUEL_SCENARIO)?;
    scenario.validate()?;
    execute_scenario(scenario, verbose_level, realtime)
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    info_only: bool,
    verbose_level: u8,
    realtime: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    if info_only {
        scenario.print_summary();
        return Ok(());
    }

    execute_scenario(scenario, verbose_level, realtime)
}

/// シナリオの実行
fn execute_scenario(
    scenario: ScenarioConfig,
    verbose_level: u8,
    realtime: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    scenario.print_summary();
    println!();

    let mut simulation = SimulationEngine::new(scenario, verbose_level);
    simulation.initialize()?;

    let report = if realtime {
        run_realtime(&mut simulation)?
    } else {
        simulation.run()?
    };

    println!();
    report.print();
    Ok(())
}

/// 時間刻みごとに実時間を待ちながら実行
///
/// 待つのはティックの間だけで、シミュレーション結果は通常実行と同じです。
fn run_realtime(simulation: &mut SimulationEngine) -> Result<SimulationReport, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let mut ticker = tokio::time::interval(Duration::from_millis(simulation.dt_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !simulation.is_finished() {
            ticker.tick().await;
            simulation.step()?;
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(simulation.finish())
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  unitsim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>   シナリオファイルを指定して実行");
    println!("  -i, --info              シナリオ情報のみ表示");
    println!("  -t, --test              組み込みの決闘デモを実行");
    println!("  -v, --verbose           詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-level <LEVEL> ログレベル (trace, debug, info, warn, error)");
    println!("      --log-output <OUT>  ログ出力先 (console, file, both)");
    println!("      --realtime          実時間に合わせて実行");
    println!("  -h, --help              このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/duel.yaml      - 1対1の決闘");
    println!("  scenarios/skirmish.yaml  - 障害物のある小規模戦闘");
    println!();
    println!("例:");
    println!("  unitsim -s scenarios/skirmish.yaml");
    println!("  unitsim -s scenarios/skirmish.yaml -vv --log-output both");
    println!("  unitsim -s scenarios/duel.yaml -i");
    println!("  unitsim --test --realtime");
}
