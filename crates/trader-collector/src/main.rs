//! Kline synchronizer CLI.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use trader_collector::config::parse_symbols;
use trader_collector::{CollectorConfig, KlineSync};
use trader_core::{init_logging, LogConfig};
use trader_data::{Database, DatabaseConfig, KlineStore, MemoryKlineStore, PgKlineStore};
use trader_exchange::BinanceClient;

#[derive(Parser)]
#[command(name = "trader-collector")]
#[command(about = "Bidirectional incremental daily kline synchronizer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// DB 대신 메모리 저장소 사용 (dry-run, 종료 시 데이터 소멸)
    #[arg(long, global = true)]
    memory: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 백필 후 정방향 동기화 (심볼별 1회)
    Sync {
        /// 동기화할 심볼 (쉼표로 구분, 예: "BTCUSDT,ETHUSDT")
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 과거 방향 백필만 실행
    Backfill {
        /// 대상 심볼 (쉼표로 구분)
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 정방향 동기화만 실행
    Forward {
        /// 대상 심볼 (쉼표로 구분)
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 워터마크, 저장 개수, 누락 구간 출력
    Status {
        /// 대상 심볼 (쉼표로 구분)
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 데몬 모드: 주기적으로 sync 실행
    Daemon,

    /// 적용된 설정을 JSON으로 출력
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 로깅 초기화
    let level = &cli.log_level;
    init_logging(
        LogConfig::new(format!(
            "trader_collector={level},trader_exchange={level},trader_data={level}"
        ))
        .with_format_from_env(),
    )
    .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    // 설정 로드
    let config = CollectorConfig::from_env();

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!("Kline Collector 시작");

    // 저장소 준비
    let database = if cli.memory {
        tracing::warn!("메모리 저장소 사용: 종료 시 데이터가 사라집니다");
        None
    } else {
        let url = config.require_database_url()?;
        let db = Database::connect(&DatabaseConfig::from_url(url)).await?;
        db.migrate().await?;
        tracing::info!("데이터베이스 연결 성공");
        Some(db)
    };
    let store: Arc<dyn KlineStore> = match &database {
        Some(db) => Arc::new(PgKlineStore::new(db.clone())),
        None => Arc::new(MemoryKlineStore::new()),
    };

    let source = Arc::new(
        BinanceClient::new(config.binance.clone()).context("Binance 클라이언트 생성 실패")?,
    );
    let engine = KlineSync::new(source, store, config.sync.clone());

    let targets = |symbols: Option<String>| match symbols {
        Some(s) => parse_symbols(&s),
        None => config.symbols.clone(),
    };

    // 명령 실행
    let result = match cli.command {
        Commands::Sync { symbols } => {
            let stats = engine.sync_symbols(&targets(symbols)).await;
            stats.log_summary("동기화");
            if stats.errors > 0 {
                Err(anyhow::anyhow!("{}개 심볼 동기화 실패", stats.errors))
            } else {
                Ok(())
            }
        }
        Commands::Backfill { symbols } => {
            let mut failed = 0usize;
            for symbol in targets(symbols) {
                match engine.backfill(&symbol).await {
                    Ok(report) => tracing::info!(
                        symbol = %symbol,
                        outcome = ?report.outcome,
                        pages = report.pages,
                        inserted = report.inserted,
                        "백필 종료"
                    ),
                    Err(e) => {
                        failed += 1;
                        tracing::error!(symbol = %symbol, error = %e, "백필 실패");
                    }
                }
            }
            if failed > 0 {
                Err(anyhow::anyhow!("{}개 심볼 백필 실패", failed))
            } else {
                Ok(())
            }
        }
        Commands::Forward { symbols } => {
            let mut failed = 0usize;
            for symbol in targets(symbols) {
                match engine.forward(&symbol).await {
                    Ok(report) => tracing::info!(
                        symbol = %symbol,
                        pages = report.pages,
                        inserted = report.inserted,
                        latest = ?report.latest_close_time,
                        "정방향 동기화 종료"
                    ),
                    Err(e) => {
                        failed += 1;
                        tracing::error!(symbol = %symbol, error = %e, "정방향 동기화 실패");
                    }
                }
            }
            if failed > 0 {
                Err(anyhow::anyhow!("{}개 심볼 정방향 동기화 실패", failed))
            } else {
                Ok(())
            }
        }
        Commands::Status { symbols } => {
            for symbol in targets(symbols) {
                let status = engine.status(&symbol).await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            Ok(())
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        tracing::info!("=== 동기화 실행 시작 ===");

                        let stats = engine.sync_symbols(&config.symbols).await;
                        stats.log_summary("동기화");

                        tracing::info!(
                            "=== 동기화 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Config => Ok(()),
    };

    if let Some(db) = database {
        db.pool().close().await;
    }
    tracing::info!("Kline Collector 종료");

    result
}
