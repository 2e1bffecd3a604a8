//! Trade simulator CLI.

use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tradesim_core::logging::{init_logging, LogConfig};
use tradesim_data::SinkMode;
use tradesim_simulator::{load_dataset, run_simulation, SimulatorConfig, SimulatorError};

#[derive(Parser)]
#[command(name = "trade-simulator")]
#[command(about = "Throughput-controlled trade replay simulator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 LOG_LEVEL 사용
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 시뮬레이션 실행 (기본)
    Run(RunArgs),

    /// 데이터셋만 로드해서 요약 출력 (싱크 연결 없음)
    Inspect,
}

/// 환경변수 설정을 덮어쓰는 실행 옵션
#[derive(Args, Default)]
struct RunArgs {
    /// 초당 배치 승인 수
    #[arg(long)]
    throughput: Option<u32>,

    /// 싱크 종류 (db, kafka)
    #[arg(long)]
    mode: Option<SinkMode>,

    /// 배치당 레코드 수
    #[arg(long)]
    batch_size: Option<usize>,

    /// 동시 전달 워커 수
    #[arg(long)]
    num_threads: Option<usize>,

    /// 제출할 최대 배치 수
    #[arg(long)]
    max_batches: Option<u64>,
}

impl RunArgs {
    fn apply(&self, config: &mut SimulatorConfig) {
        if let Some(throughput) = self.throughput {
            config.throughput = throughput;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(num_threads) = self.num_threads {
            config.num_threads = num_threads;
        }
        if self.max_batches.is_some() {
            config.max_batches = self.max_batches;
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 로깅 초기화
    let mut log_config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        log_config.level = level.to_lowercase();
    }
    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    // 설정 로드
    let command = cli.command.unwrap_or(Commands::Run(RunArgs::default()));
    let config = match load_config(&command) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "설정 로드 실패");
            return ExitCode::FAILURE;
        }
    };

    // 디스패처 1개 + 전달 워커 num_threads개
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads + 1)
        .thread_name("trade-simulator")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "런타임 생성 실패");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match command {
            Commands::Run(_) => run(&config).await,
            Commands::Inspect => inspect(&config).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Trade Simulator 비정상 종료");
            ExitCode::FAILURE
        }
    }
}

fn load_config(command: &Commands) -> Result<SimulatorConfig, SimulatorError> {
    let mut config = SimulatorConfig::from_env()?;
    if let Commands::Run(args) = command {
        args.apply(&mut config);
        config.validate()?;
    }
    Ok(config)
}

async fn run(config: &SimulatorConfig) -> Result<(), SimulatorError> {
    info!(
        mode = %config.mode,
        throughput = config.throughput,
        batch_size = config.batch_size,
        num_threads = config.num_threads,
        csv_path = %config.csv_path.display(),
        "Trade Simulator 시작"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let stats = run_simulation(config, &shutdown).await?;

    info!(total_trades_sent = stats.trades_sent, "Trade Simulator 종료");
    Ok(())
}

async fn inspect(config: &SimulatorConfig) -> Result<(), SimulatorError> {
    let dataset = load_dataset(config, &CancellationToken::new()).await?;

    info!(
        path = %config.csv_path.display(),
        rows = dataset.len(),
        tickers = dataset.distinct_tickers(),
        skipped_rows = dataset.skipped_rows(),
        synthesized_columns = ?dataset.synthesized_columns(),
        "데이터셋 요약"
    );
    Ok(())
}

/// Ctrl+C 또는 SIGTERM 수신 시 종료 토큰 취소
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C 핸들러 설치 실패");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM 핸들러 설치 실패");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to dispatcher");
}
