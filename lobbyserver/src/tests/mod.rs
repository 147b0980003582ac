//! 단위/컴포넌트 테스트 모음
//!
//! 실제 루프백 소켓으로 세션을 만들어 읽기/쓰기 파이프라인까지 검증합니다.

mod test_server;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::time::timeout;

use crate::protocol::{self, Frame, Packet};
use crate::service::session::{DisconnectHook, Session};
use crate::service::session_service::SessionService;
use crate::service::user_service::{User, UserService};

pub(crate) const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// (서버 쪽 소켓, 클라이언트 소켓)
pub(crate) async fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (accepted.unwrap().0, client.unwrap())
}

pub(crate) fn noop_hook() -> DisconnectHook {
    Arc::new(|_: &Arc<Session>| {})
}

pub(crate) fn counting_hook(counter: Arc<AtomicUsize>) -> DisconnectHook {
    Arc::new(move |_: &Arc<Session>| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

pub(crate) fn new_session_service() -> SessionService {
    SessionService::new(Handle::current())
}

/// 등록된 세션과 그 상대편 클라이언트 소켓
pub(crate) async fn connected_session(
    sessions: &SessionService,
    hook: DisconnectHook,
) -> (Arc<Session>, TcpStream) {
    let (server_side, client) = tcp_pair().await;
    let session = sessions.create_session(server_side, hook).unwrap();
    (session, client)
}

/// 로그인한 것과 같은 상태의 사용자
pub(crate) fn online_user(users: &UserService, name: &str, session: &Arc<Session>) -> Arc<User> {
    let user = users.create_user(name).unwrap();
    user.bind_session(session);
    user.set_online(true);
    session.authenticate(user.user_id());
    user
}

/// 프레임 하나를 읽습니다. 시간 초과나 연결 종료면 `None`.
pub(crate) async fn read_any_frame(client: &mut TcpStream) -> Option<Frame> {
    let mut scratch = BytesMut::new();
    match timeout(READ_TIMEOUT, protocol::read_frame(client, &mut scratch)).await {
        Ok(Ok(frame)) => Some(frame),
        _ => None,
    }
}

/// `P` 패킷이 올 때까지 다른 프레임은 건너뛰며 읽습니다.
pub(crate) async fn read_packet<P: Packet>(client: &mut TcpStream) -> P {
    loop {
        let frame = read_any_frame(client)
            .await
            .unwrap_or_else(|| panic!("{:?} 패킷을 받지 못했습니다", P::ID));
        if let Some(packet) = P::decode(&frame) {
            return packet;
        }
    }
}

/// 상대가 연결을 닫았는지 확인합니다 (남은 프레임은 버림).
pub(crate) async fn wait_for_eof(client: &mut TcpStream) -> bool {
    use tokio::io::AsyncReadExt;

    let mut buf = [0u8; 1024];
    let result = timeout(READ_TIMEOUT, async {
        loop {
            match client.read(&mut buf).await {
                Ok(0) | Err(_) => return true,
                Ok(_) => continue,
            }
        }
    })
    .await;
    result.unwrap_or(false)
}

/// 조건이 참이 될 때까지 기다립니다.
pub(crate) async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    timeout(READ_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
