//! Chat4BA - Client Library
//!
//! 스프레드시트/문서를 업로드해 스키마로 모델링하고 AI 백엔드에 질문하는
//! Chat4BA 클라이언트. 세션 상태와 뷰 모델 로직은 UI와 무관하게 이
//! 라이브러리에 있고, `chat4ba` 바이너리는 터미널 프론트엔드입니다.

pub mod api;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod registry;
pub mod schema_grid;
pub mod store;
pub mod upload;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::AppState;
use crate::config::AppConfig;
use crate::error::{CommandError, CommandResult};

/// stderr 로그 초기화 (RUST_LOG 우선, 없으면 -v 횟수로 결정)
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "chat4ba_lib=info",
        _ => "chat4ba_lib=debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn dispatch(cli: Cli) -> CommandResult<()> {
    // 로컬 미리보기는 설정/저장소 없이 실행
    if let Command::Inspect { path, rows } = &cli.command {
        return cli::inspect(path.clone(), *rows, cli.json);
    }

    let config = AppConfig::load()?.with_overrides(cli.api_url.clone(), cli.data_dir.clone());
    tracing::info!("[Config] API: {}, data: {}", config.api_url, config.data_dir.display());

    let state = AppState::open(config)?;
    cli::execute(cli, &state).await
}

/// CLI 실행
pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(error) = runtime.block_on(dispatch(cli)) {
        report(&error);
        std::process::exit(1);
    }
}

fn report(error: &CommandError) {
    eprintln!("Error: {}", error.message);
    if let Some(details) = &error.details {
        tracing::debug!("[{}] {}", error.code, details);
    }
}
