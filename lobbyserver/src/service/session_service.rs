//! 세션 레지스트리
//!
//! 살아있는 모든 연결을 소유하며 세션을 생성/제거하는 유일한 컴포넌트입니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::service::session::{DisconnectHook, Session};
use crate::tool::error::LobbyResult;

/// 세션 레지스트리
pub struct SessionService {
    sessions: RwLock<HashMap<u64, Arc<Session>>>,
    next_session_id: AtomicU64,
    runtime: Handle,
}

impl SessionService {
    pub fn new(runtime: Handle) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            runtime,
        }
    }

    /// 수락된 소켓으로 세션을 만들고 등록합니다.
    ///
    /// 읽기 루프는 시작하지 않습니다. 등록이 끝난 뒤 호출자가 `start`를 부릅니다.
    pub fn create_session(
        &self,
        stream: TcpStream,
        on_disconnect: DisconnectHook,
    ) -> LobbyResult<Arc<Session>> {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = Session::new(session_id, stream, self.runtime.clone(), on_disconnect)?;

        let total = {
            let mut sessions = self.sessions.write();
            sessions.insert(session_id, Arc::clone(&session));
            sessions.len()
        };

        info!(
            "세션 {} 등록 ({}). 전체 세션: {}",
            session_id,
            session.peer_addr(),
            total
        );
        Ok(session)
    }

    pub fn get_session(&self, session_id: u64) -> Option<Arc<Session>> {
        self.sessions.read().get(&session_id).cloned()
    }

    /// 해당 사용자로 인증된 세션을 찾습니다.
    pub fn find_by_user_id(&self, user_id: u32) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .values()
            .find(|session| session.is_authenticated() && session.user_id() == user_id)
            .cloned()
    }

    /// 현재 시점의 세션 목록 복사본
    pub fn list_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn remove_session(&self, session_id: u64) -> bool {
        let (removed, total) = {
            let mut sessions = self.sessions.write();
            let removed = sessions.remove(&session_id).is_some();
            (removed, sessions.len())
        };

        if removed {
            info!("세션 {} 제거. 전체 세션: {}", session_id, total);
        }
        removed
    }

    /// 인증된 모든 세션에 프레임을 보냅니다. 전송 대상 수를 반환합니다.
    pub fn broadcast_to_all(&self, frame: &Bytes) -> usize {
        let targets: Vec<Arc<Session>> = self
            .sessions
            .read()
            .values()
            .filter(|session| session.is_authenticated() && !session.is_disconnected())
            .cloned()
            .collect();

        for session in &targets {
            session.send(frame.clone());
        }
        debug!("전체 브로드캐스트: {}개 세션", targets.len());
        targets.len()
    }

    /// 모든 세션을 끊습니다.
    ///
    /// 종료 콜백이 레지스트리를 다시 잠그므로 목록을 복사한 뒤 락 밖에서 끊습니다.
    pub fn disconnect_all(&self) -> usize {
        let sessions = self.list_sessions();
        for session in &sessions {
            session.disconnect();
        }
        info!("세션 {}개 연결 해제", sessions.len());
        sessions.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn authenticated_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|session| session.is_authenticated())
            .count()
    }
}
