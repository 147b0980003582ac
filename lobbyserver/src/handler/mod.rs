//! 로비 서버 핸들러 레이어
//!
//! 패킷 디스패처와 요청별 비즈니스 핸들러를 담당합니다.
//! 핸들러는 `(세션, 요청)`을 받아 레지스트리를 갱신하고 응답을 큐에 넣을 뿐
//! 블로킹하지 않습니다.

pub mod auth_handler;
pub mod chat_handler;
pub mod connection_handler;
pub mod dispatcher;
pub mod game_handler;
pub mod room_handler;

use std::sync::Arc;

pub use dispatcher::{DispatchStats, PacketDispatcher, PacketHandlerFn};

use crate::protocol::{
    ChatRequest, CreateRoomRequest, EnterRoomRequest, LeaveRoomRequest, LoginRequest,
    LogoutRequest, PlayerStateRequest, RoomListRequest,
};
use crate::service::ServerState;

/// 모든 요청 핸들러를 디스패처에 등록합니다.
pub fn register_all_handlers(dispatcher: &mut PacketDispatcher, state: &Arc<ServerState>) {
    let s = Arc::clone(state);
    dispatcher.register::<LoginRequest, _>(move |session, request| {
        auth_handler::handle_login(&s, session, request)
    });

    let s = Arc::clone(state);
    dispatcher.register::<LogoutRequest, _>(move |session, request| {
        auth_handler::handle_logout(&s, session, request)
    });

    let s = Arc::clone(state);
    dispatcher.register::<CreateRoomRequest, _>(move |session, request| {
        room_handler::handle_create_room(&s, session, request)
    });

    let s = Arc::clone(state);
    dispatcher.register::<EnterRoomRequest, _>(move |session, request| {
        room_handler::handle_enter_room(&s, session, request)
    });

    let s = Arc::clone(state);
    dispatcher.register::<LeaveRoomRequest, _>(move |session, request| {
        room_handler::handle_leave_room(&s, session, request)
    });

    let s = Arc::clone(state);
    dispatcher.register::<RoomListRequest, _>(move |session, request| {
        room_handler::handle_room_list(&s, session, request)
    });

    let s = Arc::clone(state);
    dispatcher.register::<ChatRequest, _>(move |session, request| {
        chat_handler::handle_chat(&s, session, request)
    });

    let s = Arc::clone(state);
    dispatcher.register::<PlayerStateRequest, _>(move |session, request| {
        game_handler::handle_player_state(&s, session, request)
    });
}
