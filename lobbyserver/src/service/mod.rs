//! 로비 서버 서비스 레이어
//!
//! # 서비스 구조
//!
//! ```text
//! Service Layer
//! ├── Session / SessionService (연결 관리)
//! │   ├── 프레임 읽기 루프
//! │   ├── 단일 비행 쓰기 큐
//! │   └── 전체 브로드캐스트
//! ├── User / UserService (사용자 관리)
//! │   ├── 이름 중복 방지
//! │   └── 연결 Weak 바인딩
//! ├── Room / RoomService (방 관리)
//! │   ├── 정원 제한 멤버십
//! │   └── 주기적 상태 브로드캐스트
//! └── LobbyServer (TCP 서버)
//!     ├── 연결 수락
//!     ├── 종료 처리
//!     └── 통계 수집
//! ```

pub mod room;
pub mod room_service;
pub mod session;
pub mod session_service;
pub mod tcp_service;
pub mod user_service;

pub use room::Room;
pub use room_service::RoomService;
pub use session::{DisconnectHook, Session};
pub use session_service::SessionService;
pub use tcp_service::{LobbyServer, ServerState, ServerStats, ShutdownHandle};
pub use user_service::{User, UserService};
