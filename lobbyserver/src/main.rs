//! 로비 서버 메인 진입점
//!
//! 환경변수:
//! - lobby_host: 바인딩 호스트 (기본값: "0.0.0.0")
//! - lobby_port: 바인딩 포트 (기본값: "31452")
//! - lobby_tick_interval_ms: 방 틱 주기 (기본값: "50")
//! - lobby_room_capacity: 클라이언트가 만든 방의 정원 (기본값: "4")
//! - lobby_default_rooms: 시작 시 만들 방 (기본값: "Lobby:100,Room1:4")
//! - lobby_stats_interval_secs: 상태 로그 주기, 0이면 끔 (기본값: "60")

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lobbyserver::{validate_config, LobbyServer, LobbyServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // 로깅 설정
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = LobbyServerConfig::from_env()?;
    validate_config(&config).context("설정 검증 실패")?;

    info!("=== 로비 서버 설정 ===");
    info!("바인딩 주소: {}", config.bind_address());
    info!("방 틱 주기: {}ms", config.tick_interval_ms);
    info!("기본 방: {:?}", config.default_rooms);
    info!("======================");

    let server = Arc::new(
        LobbyServer::bind(config)
            .await
            .context("로비 서버 바인드 실패")?,
    );
    let shutdown = server.shutdown_handle();

    let server_task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("로비 서버 실행 오류: {}", e);
            }
        })
    };

    // 종료 시그널 대기
    tokio::signal::ctrl_c()
        .await
        .context("종료 시그널 대기 실패")?;
    info!("종료 시그널 수신, 서버를 중지합니다...");

    shutdown.shutdown();
    server_task.await.context("서버 태스크 종료 대기 실패")?;

    Ok(())
}
