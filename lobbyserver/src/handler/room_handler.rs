//! 방 관련 핸들러

use std::sync::Arc;

use tracing::debug;

use crate::protocol::{
    CreateRoomRequest, CreateRoomResponse, EnterRoomRequest, EnterRoomResponse,
    LeaveRoomRequest, LeaveRoomResponse, RoomListRequest, RoomListResponse, RoomSummary,
    MAX_ROOM_LIST, MAX_ROOM_NAME_LEN,
};
use crate::service::session::Session;
use crate::service::user_service::User;
use crate::service::ServerState;

fn authenticated_user(state: &ServerState, session: &Arc<Session>) -> Option<Arc<User>> {
    if !session.is_authenticated() {
        return None;
    }
    state.users.get_user(session.user_id())
}

/// 방 생성. 설정된 정원으로 만들며 만든 사람이 자동 입장하지는 않습니다.
///
/// 이름은 NUL 종료자를 포함해 [`MAX_ROOM_NAME_LEN`]바이트에 들어가야 합니다.
pub fn handle_create_room(state: &ServerState, session: &Arc<Session>, request: CreateRoomRequest) {
    let created = session.is_authenticated()
        && !request.room_name.is_empty()
        && request.room_name.len() < MAX_ROOM_NAME_LEN
        && state
            .rooms
            .create_room(&request.room_name, state.config.room_capacity)
            .is_some();

    if !created {
        debug!(
            "세션 {} 방 생성 실패: '{}'",
            session.session_id(),
            request.room_name
        );
    }
    session.send_packet(&CreateRoomResponse::new(created));
}

/// 방 입장
pub fn handle_enter_room(state: &ServerState, session: &Arc<Session>, request: EnterRoomRequest) {
    let entered = match (
        authenticated_user(state, session),
        state.rooms.get_room_by_name(&request.room_name),
    ) {
        (Some(user), Some(room)) => room.add_member(&user),
        _ => false,
    };

    session.send_packet(&EnterRoomResponse::new(entered));
}

/// 방 퇴장
pub fn handle_leave_room(state: &ServerState, session: &Arc<Session>, request: LeaveRoomRequest) {
    let left = match (
        authenticated_user(state, session),
        state.rooms.get_room_by_name(&request.room_name),
    ) {
        (Some(user), Some(room)) => room.remove_member(user.user_id()),
        _ => false,
    };

    session.send_packet(&LeaveRoomResponse::new(left));
}

/// 방 목록. ID 순으로 최대 10개.
pub fn handle_room_list(state: &ServerState, session: &Arc<Session>, _request: RoomListRequest) {
    let rooms: Vec<RoomSummary> = state
        .rooms
        .list_rooms()
        .iter()
        .take(MAX_ROOM_LIST)
        .map(|room| RoomSummary {
            room_name: room.name().to_string(),
            player_count: room.member_count() as u16,
        })
        .collect();

    debug!("세션 {} 방 목록 요청: {}개", session.session_id(), rooms.len());
    session.send_packet(&RoomListResponse { rooms });
}
