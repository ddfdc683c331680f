use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use clap::{Arg, Command};
use tracing::{info, error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tokio::signal;

use xcrack_bundle_searcher::{Config, SearcherCore};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("xcrack-bundle-searcher")
        .version("0.1.0")
        .author("xCrack Team <team@xcrack.dev>")
        .about("🥪 Flashbots 번들 서쳐 - 멤풀 감지부터 번들 제출까지")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로")
                .default_value("config/default.toml")
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("simulation")
                .long("simulation")
                .help("시뮬레이션 모드 (eth_callBundle만 수행, 실제 번들을 제출하지 않음)")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .help("Mock 체인/릴레이로 실행")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    // .env 로드 (없어도 무시)
    dotenvy::dotenv().ok();

    // 설정 파일 로드
    let config_path = matches.get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/default.toml");
    let config_result = if Path::new(config_path).exists() {
        Config::load(config_path).await.map(Some)
    } else {
        Ok(None)
    };

    let mut config = match &config_result {
        Ok(Some(config)) => config.clone(),
        _ => Config::default(),
    };

    // 로그 레벨: 명령줄 > 설정 파일, RUST_LOG가 있으면 우선
    let log_level = matches.get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.monitoring.log_level.clone());
    let log_filter = match log_level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    match config_result {
        Ok(Some(_)) => info!("📋 설정 파일 로드 완료: {}", config_path),
        Ok(None) => warn!("⚠️ 설정 파일이 없어 기본 설정을 사용합니다: {}", config_path),
        Err(e) => {
            error!("❌ 설정 파일 파싱 실패 ({}): {}", config_path, e);
            std::process::exit(1);
        }
    }

    // 명령줄 옵션 적용
    if matches.get_flag("simulation") {
        warn!("🧪 시뮬레이션 모드 활성화 - 실제 번들을 제출하지 않습니다");
        config.flashbots.simulation_mode = true;
    }

    if matches.get_flag("mock") {
        info!("🎭 Mock 모드 활성화");
        config.mock_mode = true;
    }

    // 환경 변수에서 민감한 정보 로드
    config.apply_env_overrides();

    // 설정 검증
    if let Err(e) = config.validate() {
        error!("❌ 설정 검증 실패: {}", e);
        std::process::exit(1);
    }
    info!("✅ 설정 로드 완료");

    let status_interval = Duration::from_secs(config.monitoring.status_report_interval_secs.max(1));

    // 서명자/릴레이 없이 부분적으로 돌지 않는다
    let searcher_core = match SearcherCore::from_config(Arc::new(config)).await {
        Ok(core) => Arc::new(core),
        Err(e) => {
            error!("❌ 서쳐 초기화 실패, MEV 서브시스템을 비활성화합니다: {}", e);
            std::process::exit(1);
        }
    };

    searcher_core.start().await?;

    // 주기적 상태 리포트
    let reporter = Arc::clone(&searcher_core);
    let report_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(status_interval);
        interval.tick().await;

        loop {
            interval.tick().await;
            reporter.status().await.log_report();
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => warn!("🛑 종료 신호 수신됨, 안전하게 종료 중..."),
        Err(e) => error!("❌ 신호 처리 오류: {}", e),
    }

    report_task.abort();
    if let Err(e) = searcher_core.stop().await {
        error!("❌ 서쳐 중지 실패: {}", e);
    }
    searcher_core.status().await.log_report();

    info!("👋 서쳐 종료");
    Ok(())
}

fn print_banner() {
    println!(r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║                                                              ║
    ║  🥪 xCrack Bundle Searcher v0.1.0                            ║
    ║                                                              ║
    ║  🎯 파이프라인:                                              ║
    ║     • 멤풀 스캔 → 수익 추정 → 번들 생성 → 번들 제출          ║
    ║                                                              ║
    ║  🛡️ 안전 장치:                                              ║
    ║     • 시뮬레이션 모드 (eth_callBundle)                       ║
    ║     • 사이클 직렬 실행 (논스 경합 없음)                       ║
    ║     • Mock 모드                                              ║
    ║                                                              ║
    ╚══════════════════════════════════════════════════════════════╝
    "#);
}
