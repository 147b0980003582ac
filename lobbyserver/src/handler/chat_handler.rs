//! 채팅 핸들러

use std::sync::Arc;

use tracing::debug;

use crate::protocol::{ChatNotice, ChatRequest, Packet};
use crate::service::session::Session;
use crate::service::ServerState;

/// 채팅
///
/// 인증된 세션만 보낼 수 있으며, 인증된 모든 세션에 전달됩니다.
pub fn handle_chat(state: &ServerState, session: &Arc<Session>, request: ChatRequest) {
    if !session.is_authenticated() {
        return;
    }
    let Some(user) = state.users.get_user(session.user_id()) else {
        return;
    };

    let notice = ChatNotice::new(user.username(), request.message);
    let sent = state.sessions.broadcast_to_all(&notice.encode());
    debug!("채팅 {} → {}개 세션", user.username(), sent);
}
