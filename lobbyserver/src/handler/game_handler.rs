//! 게임 상태 핸들러

use std::sync::Arc;

use tracing::trace;

use crate::protocol::PlayerStateRequest;
use crate::service::session::Session;
use crate::service::ServerState;

/// 위치 보고. 다음 방 틱에서 멤버들에게 전파됩니다.
pub fn handle_player_state(state: &ServerState, session: &Arc<Session>, request: PlayerStateRequest) {
    if !session.is_authenticated() {
        return;
    }
    if let Some(user) = state.users.get_user(session.user_id()) {
        user.set_character_state(request.state);
        trace!(
            "사용자 {} 위치 ({}, {})",
            user.user_id(),
            request.state.pos_x,
            request.state.pos_y
        );
    }
}
