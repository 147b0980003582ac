//! 연결 종료 정리

use std::sync::Arc;

use tracing::info;

use crate::service::session::Session;
use crate::service::user_service::User;
use crate::service::ServerState;

/// 사용자를 모든 방에서 빼고 오프라인으로 표시합니다. 나간 방 수를 반환합니다.
pub fn detach_user(state: &ServerState, user: &User) -> usize {
    let left = state.rooms.remove_user_from_all(user.user_id());
    user.set_online(false);
    user.unbind_session();
    left
}

/// 세션 종료 콜백
///
/// 인증된 세션이면 바인딩된 사용자를 정리하고, 레지스트리에서 세션을 제거합니다.
pub fn handle_disconnect(state: &ServerState, session: &Arc<Session>) {
    if session.is_authenticated() {
        if let Some(user) = state.users.get_user(session.user_id()) {
            let left = detach_user(state, &user);
            info!(
                "사용자 {} 연결 종료 정리: 방 {}개에서 퇴장",
                user.username(),
                left
            );
        }
    }

    state.sessions.remove_session(session.session_id());
}
