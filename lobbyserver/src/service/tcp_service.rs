//! 로비 TCP 서버
//!
//! 리스닝 소켓, 레지스트리 묶음(`ServerState`), 핸들러 집합을 소유하고
//! 수락된 연결을 디스패처에 연결합니다.

use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::LobbyServerConfig;
use crate::handler::{self, connection_handler, DispatchStats, PacketDispatcher};
use crate::service::room_service::RoomService;
use crate::service::session::{DisconnectHook, Session};
use crate::service::session_service::SessionService;
use crate::service::user_service::UserService;
use crate::tool::error::{ErrorHandler, ErrorSeverity, LobbyError, LobbyResult};

/// 수락 실패 후 다시 시도하기까지 대기 시간
pub(crate) const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// 수락 실패 뒤 잠시 쉽니다. EMFILE 같은 지속 오류에서 루프가 헛돌지 않게 합니다.
///
/// 기다리는 동안 종료 요청이 오면 `false`.
pub(crate) async fn pause_after_accept_error(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = shutdown.wait_for(|stop| *stop) => false,
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
    }
}

/// 서버 공유 상태
///
/// 레지스트리는 전역 싱글톤이 아니라 이 구조체를 통해 필요한 곳에 전달됩니다.
pub struct ServerState {
    pub config: LobbyServerConfig,
    pub sessions: SessionService,
    pub users: UserService,
    pub rooms: RoomService,
}

impl ServerState {
    pub fn new(config: LobbyServerConfig, runtime: Handle) -> Self {
        Self {
            sessions: SessionService::new(runtime.clone()),
            users: UserService::new(),
            rooms: RoomService::new(config.tick_interval(), runtime),
            config,
        }
    }

    /// 설정된 기본 방을 만듭니다.
    pub fn create_default_rooms(&self) {
        for room in &self.config.default_rooms {
            if self.rooms.create_room(&room.name, room.capacity).is_none() {
                let error = LobbyError::configuration(
                    "lobby_default_rooms",
                    format!("이미 존재하는 방: {}", room.name),
                );
                ErrorHandler::handle_error(
                    &error,
                    ErrorSeverity::Warning,
                    "ServerState",
                    "create_default_rooms",
                );
            }
        }
    }
}

/// 서버 상태 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub sessions: usize,
    pub authenticated_sessions: usize,
    pub users: usize,
    pub online_users: usize,
    pub rooms: usize,
    pub dispatch: DispatchStats,
}

/// 서버 종료 요청 핸들
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// 로비 서버
pub struct LobbyServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<ServerState>,
    dispatcher: Arc<PacketDispatcher>,
    shutdown: Arc<watch::Sender<bool>>,
    started_at: Instant,
}

impl LobbyServer {
    /// 리스닝 소켓을 열고 기본 방과 핸들러를 준비합니다.
    ///
    /// 런타임 안에서 호출해야 합니다.
    pub async fn bind(config: LobbyServerConfig) -> LobbyResult<Self> {
        let bind_addr = config.bind_address();
        info!("🚀 로비 서버 시작 중... ({})", bind_addr);

        let listener = TcpListener::bind(&bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let state = Arc::new(ServerState::new(config, Handle::current()));
        state.create_default_rooms();

        let mut dispatcher = PacketDispatcher::new();
        handler::register_all_handlers(&mut dispatcher, &state);
        info!("패킷 핸들러 {}개 등록", dispatcher.handler_count());

        let (shutdown, _) = watch::channel(false);

        info!("✅ 로비 서버가 {}에서 대기 중입니다", local_addr);
        Ok(Self {
            listener,
            local_addr,
            state,
            dispatcher: Arc::new(dispatcher),
            shutdown: Arc::new(shutdown),
            started_at: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// 종료 요청이 올 때까지 연결을 수락합니다. 반환 전에 [`LobbyServer::stop`]을 호출합니다.
    pub async fn run(&self) -> LobbyResult<()> {
        let mut shutdown = self.shutdown.subscribe();
        let stats_task = self.spawn_stats_logger();

        loop {
            tokio::select! {
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.accept_connection(stream, addr),
                    Err(e) => {
                        ErrorHandler::handle_error(
                            &LobbyError::Io(e),
                            ErrorSeverity::Error,
                            "LobbyServer",
                            "accept",
                        );
                        if !pause_after_accept_error(&mut shutdown).await {
                            break;
                        }
                    }
                },
            }
        }

        if let Some(task) = stats_task {
            task.abort();
        }
        self.stop();
        Ok(())
    }

    fn accept_connection(&self, stream: TcpStream, addr: SocketAddr) {
        debug!("새 연결 수락: {}", addr);

        let state: Weak<ServerState> = Arc::downgrade(&self.state);
        let on_disconnect: DisconnectHook = Arc::new(move |session: &Arc<Session>| {
            if let Some(state) = state.upgrade() {
                connection_handler::handle_disconnect(&state, session);
            }
        });

        let session = match self.state.sessions.create_session(stream, on_disconnect) {
            Ok(session) => session,
            Err(e) => {
                ErrorHandler::handle_error(&e, ErrorSeverity::Warning, "LobbyServer", "create_session");
                return;
            }
        };

        if let Err(e) = session.start(Arc::clone(&self.dispatcher)) {
            ErrorHandler::handle_error(&e, ErrorSeverity::Error, "LobbyServer", "start_session");
            session.disconnect();
        }
    }

    /// 모든 세션을 끊고 모든 방의 틱을 멈춥니다.
    pub fn stop(&self) {
        info!("🛑 로비 서버 중지 중...");
        self.shutdown.send_replace(true);
        self.state.sessions.disconnect_all();
        self.state.rooms.shutdown();
        info!("✅ 로비 서버가 중지되었습니다");
    }

    pub fn stats(&self) -> ServerStats {
        collect_stats(&self.state, &self.dispatcher, self.started_at)
    }

    fn spawn_stats_logger(&self) -> Option<tokio::task::JoinHandle<()>> {
        let period = self.state.config.stats_interval()?;
        let state = Arc::downgrade(&self.state);
        let dispatcher = Arc::clone(&self.dispatcher);
        let started_at = self.started_at;

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                let stats = collect_stats(&state, &dispatcher, started_at);
                match serde_json::to_string(&stats) {
                    Ok(json) => info!("📊 서버 상태: {}", json),
                    Err(e) => error!("서버 상태 직렬화 실패: {}", e),
                }
            }
        }))
    }
}

fn collect_stats(state: &ServerState, dispatcher: &PacketDispatcher, started_at: Instant) -> ServerStats {
    ServerStats {
        uptime_secs: started_at.elapsed().as_secs(),
        sessions: state.sessions.session_count(),
        authenticated_sessions: state.sessions.authenticated_count(),
        users: state.users.user_count(),
        online_users: state.users.online_users().len(),
        rooms: state.rooms.room_count(),
        dispatch: dispatcher.stats(),
    }
}
