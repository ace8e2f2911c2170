mod fleet;
mod guidance;
mod logging;
mod mission;
mod sequencer;
mod vessel;

use std::str::FromStr;

use clap::{Arg, Command};
use tracing::Level;

use logging::{ensure_log_directory, init_logging, LogConfig, LogOutput};
use mission::MissionConfig;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("autoland")
        .version("0.1.0")
        .about("自動着陸誘導 (Automatic Landing Guidance)")
        .long_about("フェーズ制御型の動力降下・着陸誘導システム\n\
                     テレメトリをポーリングし、逆行姿勢とスロットルを閉ループで指令して着陸させます。")
        .arg(
            Arg::new("mission")
                .short('m')
                .long("mission")
                .value_name("FILE")
                .help("ミッションファイル(.yaml)のパスを指定")
                .long_help("実行するミッションファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、デフォルトのテストモードで実行されます。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("ミッションの情報のみ表示して終了")
                .conflicts_with("test")
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("デフォルトミッションでの着陸セルフテストを実行")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 詳細, -vv: デバッグ)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("DEST")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .help("ミッションログの出力ディレクトリ")
        )
        .get_matches();

    println!("自動着陸誘導 (Automatic Landing Guidance) - autoland v0.1.0");
    println!();

    // 詳細レベルの設定
    let verbose_level = matches.get_count("verbose");
    let log_level = match verbose_level {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // ログ出力先の設定
    let mut log_config = LogConfig {
        level: log_level,
        ..LogConfig::default()
    };
    if let Some(dest) = matches.get_one::<String>("log-output") {
        match LogOutput::from_str(dest) {
            Ok(output) => log_config.output = output,
            Err(e) => {
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        }
    }
    if let Some(dir) = matches.get_one::<String>("log-dir") {
        log_config.log_dir = dir.clone();
    }

    if log_config.output != LogOutput::Console {
        if let Err(e) = ensure_log_directory(&log_config.log_dir) {
            eprintln!("エラー: ログディレクトリを作成できません: {}", e);
            std::process::exit(1);
        }
    }
    if let Err(e) = init_logging(log_config) {
        eprintln!("エラー: ログ初期化に失敗しました: {}", e);
        std::process::exit(1);
    }

    // テストモードの実行
    if matches.get_flag("test") {
        println!("=== 着陸セルフテストモード ===");
        run_self_test();
        return;
    }

    // ミッションファイルの処理
    if let Some(mission_path) = matches.get_one::<String>("mission") {
        match run_mission(mission_path, matches.get_flag("info"), verbose_level) {
            Ok(all_landed) => {
                if verbose_level > 0 {
                    println!("ミッション実行が完了しました。");
                }
                if !all_landed {
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        // デフォルト動作: 使用方法を表示
        show_default_help();
    }
}

/// デフォルトミッションでの着陸セルフテスト
///
/// スリープなしのポーリングで模擬機体を1機着陸させ、シーケンス全体の
/// 健全性を短時間で確認します。
fn run_self_test() {
    let mut config = MissionConfig::default_mission();
    config.polling.approach_s = 0.0;
    config.polling.horizontal_s = 0.0;
    config.polling.descent_search_s = 0.0;
    config.polling.vertical_s = 0.0;

    config.print_summary();
    println!();

    match fleet::land_fleet(&config) {
        Ok(reports) => {
            for report in &reports {
                match &report.result {
                    Ok(outcome) => {
                        println!("{}: {:?}", report.vessel_name, outcome);
                    }
                    Err(e) => {
                        println!("{}: 失敗 ({})", report.vessel_name, e);
                    }
                }
            }
            if reports.iter().all(|r| r.is_touchdown()) {
                println!("\nセルフテスト成功: 全機が接地しました！");
            } else {
                println!("\nセルフテスト失敗");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}

/// ミッションファイルを読み込んで実行
///
/// 全機が正常接地した場合はOk(true)、一部が失敗・中断した場合はOk(false)
fn run_mission(
    mission_path: &str,
    info_only: bool,
    verbose_level: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    // ミッションファイルの読み込み
    let config = MissionConfig::from_file(mission_path)?;

    if verbose_level > 0 {
        println!("ミッションファイル読み込み完了: {}", mission_path);
    }

    // 基本情報表示
    config.print_summary();
    println!();

    // 情報表示のみの場合
    if info_only {
        return Ok(true);
    }

    // 着陸シーケンス実行
    let reports = fleet::land_fleet(&config)?;

    println!();
    println!("=== 着陸結果 ===");
    for report in &reports {
        match &report.result {
            Ok(outcome) => println!("{}: {:?}", report.vessel_name, outcome),
            Err(e) => println!("{}: 失敗 ({})", report.vessel_name, e),
        }
    }

    Ok(reports.iter().all(|r| r.is_touchdown()))
}

/// デフォルトヘルプとミッション一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  autoland [オプション]");
    println!();
    println!("オプション:");
    println!("  -m, --mission <FILE>   ミッションファイルを指定して実行");
    println!("  -i, --info             ミッション情報のみ表示");
    println!("  -t, --test             着陸セルフテストの実行");
    println!("  -v, --verbose          詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-output <DEST> ログ出力先 (console, file, both)");
    println!("      --log-dir <DIR>    ミッションログの出力ディレクトリ");
    println!("  -h, --help             このヘルプを表示");
    println!();
    println!("利用可能なミッションファイル:");
    println!("  missions/mission_single_landing.yaml  - 単機着陸");
    println!("  missions/mission_decoupled_fleet.yaml - 分離3機の同時着陸");
    println!();
    println!("例:");
    println!("  autoland -m missions/mission_single_landing.yaml");
    println!("  autoland -m missions/mission_decoupled_fleet.yaml -v");
    println!("  autoland -m missions/mission_single_landing.yaml -i");
    println!("  autoland --test");
}
