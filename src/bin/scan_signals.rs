use chrono::Utc;
use log::{debug, error, info};
use signal_engine::config_loader::ConfigLoader;
use signal_engine::scanner::Scanner;
use signal_engine::strategy::{StrategyFactory, StrategyType};
use signal_engine::supply::{JsonFileSupplier, SymbolSource};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    // 로그 초기화
    env_logger::init();

    info!("신호 스캐너 시작");

    // 커맨드 라인 인수 파싱: [설정_파일_경로] [전략_타입]
    let args: Vec<String> = env::args().collect();
    debug!("커맨드 라인 인수: {:?}", args);

    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("사용법: {} [설정_파일_경로] [전략_타입]", args[0]);
        println!("지원되는 전략 타입: structure_volume, trend_momentum, trend_volume");
        return ExitCode::SUCCESS;
    }

    let config_path = args.get(1).map(PathBuf::from);
    let mut config = match ConfigLoader::load_engine_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("설정 로드 실패: {}", e);
            eprintln!("설정 로드 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(strategy_str) = args.get(2) {
        match strategy_str.parse::<StrategyType>() {
            Ok(strategy_type) => config.strategy.strategy_type = strategy_type,
            Err(e) => {
                error!("{}", e);
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let data_dir = config
        .scan
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("data"));
    let supplier = JsonFileSupplier::new(&data_dir);

    let symbols = if config.scan.symbols.is_empty() {
        match supplier.list_symbols() {
            Ok(symbols) => symbols,
            Err(e) => {
                error!("심볼 목록 조회 실패: {}", e);
                eprintln!("심볼 목록 조회 실패: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        config.scan.symbols.clone()
    };
    info!("데이터 디렉터리: {}, 심볼 {}개", data_dir.display(), symbols.len());

    let strategy = StrategyFactory::from_config(&config);
    let scanner = Scanner::new(&config, strategy.as_ref(), &supplier);
    let report = match scanner.scan(&symbols, Utc::now()) {
        Ok(report) => report,
        Err(e) => {
            error!("스캔 실패: {}", e);
            eprintln!("스캔 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let signals: Vec<_> = report.signals().collect();
    if signals.is_empty() {
        println!("신호 없음");
    }
    for signal in signals.iter().take(config.scan.max_signals) {
        println!("{}", signal);
    }
    if signals.len() > config.scan.max_signals {
        println!("... 외 {}건", signals.len() - config.scan.max_signals);
    }

    println!("건너뜀:");
    for (reason, count) in report.skip_counts() {
        println!("  {}: {}", reason, count);
    }
    for (symbol, message) in report.failures() {
        println!("실패 {}: {}", symbol, message);
    }

    ExitCode::SUCCESS
}
