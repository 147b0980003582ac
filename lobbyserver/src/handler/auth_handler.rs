//! 로그인/로그아웃 핸들러

use std::sync::Arc;

use tracing::{debug, info};

use crate::handler::connection_handler::detach_user;
use crate::protocol::{LoginRequest, LoginResponse, LogoutRequest, LogoutResponse};
use crate::service::session::Session;
use crate::service::ServerState;

/// 로그인
///
/// 아이디나 비밀번호가 비었거나, 이미 인증된 세션이거나, 같은 이름의 사용자가
/// 이미 있으면 실패합니다. 비밀번호 검증은 하지 않습니다.
pub fn handle_login(state: &ServerState, session: &Arc<Session>, request: LoginRequest) {
    if request.user_id.is_empty() || request.password.is_empty() {
        debug!("세션 {} 로그인 거부: 빈 아이디/비밀번호", session.session_id());
        session.send_packet(&LoginResponse::failure());
        return;
    }

    if session.is_authenticated() {
        debug!(
            "세션 {} 로그인 거부: 이미 사용자 {}로 인증됨",
            session.session_id(),
            session.user_id()
        );
        session.send_packet(&LoginResponse::failure());
        return;
    }

    let Some(user) = state.users.create_user(&request.user_id) else {
        info!("로그인 거부: 이미 존재하는 사용자 {}", request.user_id);
        session.send_packet(&LoginResponse::failure());
        return;
    };

    user.bind_session(session);
    user.set_online(true);
    session.authenticate(user.user_id());

    info!(
        "✅ 로그인 성공: {} (ID {}, 세션 {})",
        user.username(),
        user.user_id(),
        session.session_id()
    );
    session.send_packet(&LoginResponse::success(user.user_id()));
}

/// 로그아웃
///
/// 요청 본문의 아이디는 쓰지 않고 세션에 바인딩된 사용자를 로그아웃합니다.
pub fn handle_logout(state: &ServerState, session: &Arc<Session>, _request: LogoutRequest) {
    if !session.is_authenticated() {
        session.send_packet(&LogoutResponse::new(false));
        return;
    }

    if let Some(user) = state.users.get_user(session.user_id()) {
        let left = detach_user(state, &user);
        info!("로그아웃: {} (방 {}개에서 퇴장)", user.username(), left);
    }
    session.clear_authentication();
    session.send_packet(&LogoutResponse::new(true));
}
