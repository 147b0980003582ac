//! 로비/게임 TCP 서버 라이브러리
//!
//! 클라이언트가 TCP로 접속해 로그인하고, 방에 들어가 채팅하며,
//! 위치를 보고하면 방마다 주기적으로 멤버 상태를 브로드캐스트합니다.
//!
//! # 주요 기능
//!
//! - **길이 접두 바이너리 프레이밍**: 고정 헤더 + 고정 크기 본문
//! - **연결별 읽기/쓰기 파이프라인**: 단일 비행 쓰기 큐로 순서 보장
//! - **패킷 디스패치**: `PacketId → 핸들러` 맵
//! - **방 틱**: 방마다 독립적인 주기 브로드캐스트
//!
//! # 아키텍처
//!
//! ```text
//! Lobby Server
//! ├── Protocol (와이어 포맷과 메시지 카탈로그)
//! ├── Service Layer
//! │   ├── Session / SessionService
//! │   ├── User / UserService
//! │   ├── Room / RoomService
//! │   └── LobbyServer
//! ├── Handler Layer
//! │   ├── PacketDispatcher
//! │   ├── auth / room / chat / game 핸들러
//! │   └── connection_handler (종료 정리)
//! └── Tool Layer
//!     ├── Error (에러 처리)
//!     └── SimpleUtils
//! ```
//!
//! # 사용 예시
//!
//! ```no_run
//! use lobbyserver::{LobbyServer, LobbyServerConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let server = LobbyServer::bind(LobbyServerConfig::default()).await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod handler;
pub mod protocol;
pub mod service;
pub mod tool;

#[cfg(test)]
mod tests;

pub use config::{validate_config, DefaultRoom, LobbyServerConfig};
pub use handler::{register_all_handlers, DispatchStats, PacketDispatcher};
pub use protocol::{Frame, Packet, PacketHeader, PacketId};
pub use service::{
    LobbyServer, Room, RoomService, ServerState, ServerStats, Session, SessionService,
    ShutdownHandle, User, UserService,
};
pub use tool::error::{ErrorHandler, ErrorSeverity, LobbyError, LobbyResult};
