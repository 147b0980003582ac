//! 메시지 카탈로그
//!
//! 패킷마다 고정 크기 본문 레이아웃을 가집니다. 배열 필드는 항상
//! 최대 폭으로 전송되고, count 필드가 유효한 항목 수를 나타냅니다.

use bytes::{Buf, BufMut, BytesMut};

use super::{
    get_fixed_str, put_fixed_str, Packet, PacketId, HEADER_SIZE, MAX_ID_LEN, MAX_MESSAGE_LEN,
    MAX_NAME_LEN, MAX_PLAYERS_PER_ROOM, MAX_PW_LEN, MAX_ROOM_LIST, MAX_ROOM_NAME_LEN,
};

/// 캐릭터의 마지막 보고 위치
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacterState {
    pub pos_x: f32,
    pub pos_y: f32,
}

impl CharacterState {
    pub const WIRE_SIZE: usize = 8;

    pub fn new(pos_x: f32, pos_y: f32) -> Self {
        Self { pos_x, pos_y }
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_f32_le(self.pos_x);
        buf.put_f32_le(self.pos_y);
    }

    fn get(buf: &mut &[u8]) -> Self {
        Self {
            pos_x: buf.get_f32_le(),
            pos_y: buf.get_f32_le(),
        }
    }
}

/// 성공 여부만 담는 응답 패킷
macro_rules! success_response {
    ($(#[$meta:meta])* $name:ident, $id:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            pub is_success: bool,
        }

        impl $name {
            pub fn new(is_success: bool) -> Self {
                Self { is_success }
            }
        }

        impl Packet for $name {
            const ID: PacketId = $id;
            const SIZE: usize = HEADER_SIZE + 1;

            fn encode_body(&self, buf: &mut BytesMut) {
                buf.put_u8(self.is_success as u8);
            }

            fn decode_body(body: &mut &[u8]) -> Self {
                Self {
                    is_success: body.get_u8() != 0,
                }
            }
        }
    };
}

/// 방 이름 하나만 담는 요청 패킷
macro_rules! room_name_request {
    ($(#[$meta:meta])* $name:ident, $id:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub room_name: String,
        }

        impl $name {
            pub fn new(room_name: impl Into<String>) -> Self {
                Self {
                    room_name: room_name.into(),
                }
            }
        }

        impl Packet for $name {
            const ID: PacketId = $id;
            const SIZE: usize = HEADER_SIZE + MAX_ROOM_NAME_LEN;

            fn encode_body(&self, buf: &mut BytesMut) {
                put_fixed_str(buf, &self.room_name, MAX_ROOM_NAME_LEN);
            }

            fn decode_body(body: &mut &[u8]) -> Self {
                Self {
                    room_name: get_fixed_str(body, MAX_ROOM_NAME_LEN),
                }
            }
        }
    };
}

/// 로그인 요청 (10)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
        }
    }
}

impl Packet for LoginRequest {
    const ID: PacketId = PacketId::ReqLogin;
    const SIZE: usize = HEADER_SIZE + MAX_ID_LEN + MAX_PW_LEN;

    fn encode_body(&self, buf: &mut BytesMut) {
        put_fixed_str(buf, &self.user_id, MAX_ID_LEN);
        put_fixed_str(buf, &self.password, MAX_PW_LEN);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            user_id: get_fixed_str(body, MAX_ID_LEN),
            password: get_fixed_str(body, MAX_PW_LEN),
        }
    }
}

/// 로그인 응답 (11). 실패 시 `user_id`는 0입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginResponse {
    pub user_id: u32,
    pub is_success: bool,
}

impl LoginResponse {
    pub fn success(user_id: u32) -> Self {
        Self {
            user_id,
            is_success: true,
        }
    }

    pub fn failure() -> Self {
        Self::default()
    }
}

impl Packet for LoginResponse {
    const ID: PacketId = PacketId::ResLogin;
    const SIZE: usize = HEADER_SIZE + 4 + 1;

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.user_id);
        buf.put_u8(self.is_success as u8);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            user_id: body.get_u32_le(),
            is_success: body.get_u8() != 0,
        }
    }
}

/// 로그아웃 요청 (12)
///
/// `user_id` 필드는 전송되지만 서버는 세션에 바인딩된 사용자를 기준으로 처리합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutRequest {
    pub user_id: String,
}

impl Packet for LogoutRequest {
    const ID: PacketId = PacketId::ReqLogout;
    const SIZE: usize = HEADER_SIZE + MAX_ID_LEN;

    fn encode_body(&self, buf: &mut BytesMut) {
        put_fixed_str(buf, &self.user_id, MAX_ID_LEN);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            user_id: get_fixed_str(body, MAX_ID_LEN),
        }
    }
}

success_response!(
    /// 로그아웃 응답 (13)
    LogoutResponse,
    PacketId::ResLogout
);

room_name_request!(
    /// 방 생성 요청 (20)
    CreateRoomRequest,
    PacketId::ReqCreateRoom
);

success_response!(
    /// 방 생성 응답 (21)
    CreateRoomResponse,
    PacketId::ResCreateRoom
);

room_name_request!(
    /// 방 입장 요청 (22)
    EnterRoomRequest,
    PacketId::ReqEnterRoom
);

success_response!(
    /// 방 입장 응답 (23)
    EnterRoomResponse,
    PacketId::ResEnterRoom
);

room_name_request!(
    /// 방 퇴장 요청 (24)
    LeaveRoomRequest,
    PacketId::ReqLeaveRoom
);

success_response!(
    /// 방 퇴장 응답 (25)
    LeaveRoomResponse,
    PacketId::ResLeaveRoom
);

/// 방 정보 알림 (26). 입장/퇴장 시 현재 인원을 알립니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomInfoNotice {
    pub room_name: String,
    pub player_count: u16,
}

impl Packet for RoomInfoNotice {
    const ID: PacketId = PacketId::NoticeRoomInfo;
    const SIZE: usize = HEADER_SIZE + MAX_ROOM_NAME_LEN + 2;

    fn encode_body(&self, buf: &mut BytesMut) {
        put_fixed_str(buf, &self.room_name, MAX_ROOM_NAME_LEN);
        buf.put_u16_le(self.player_count);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            room_name: get_fixed_str(body, MAX_ROOM_NAME_LEN),
            player_count: body.get_u16_le(),
        }
    }
}

/// 방 목록 요청 (28). 본문이 없습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomListRequest;

impl Packet for RoomListRequest {
    const ID: PacketId = PacketId::ReqRoomList;
    const SIZE: usize = HEADER_SIZE;

    fn encode_body(&self, _buf: &mut BytesMut) {}

    fn decode_body(_body: &mut &[u8]) -> Self {
        Self
    }
}

/// 방 목록 항목
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSummary {
    pub room_name: String,
    pub player_count: u16,
}

impl RoomSummary {
    const WIRE_SIZE: usize = MAX_ROOM_NAME_LEN + 2;
}

/// 방 목록 응답 (27)
///
/// 최대 [`MAX_ROOM_LIST`]개까지만 인코딩되며 나머지는 잘립니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomSummary>,
}

impl Packet for RoomListResponse {
    const ID: PacketId = PacketId::ResRoomList;
    const SIZE: usize = HEADER_SIZE + MAX_ROOM_LIST * RoomSummary::WIRE_SIZE + 2;

    fn encode_body(&self, buf: &mut BytesMut) {
        let count = self.rooms.len().min(MAX_ROOM_LIST);
        for room in &self.rooms[..count] {
            put_fixed_str(buf, &room.room_name, MAX_ROOM_NAME_LEN);
            buf.put_u16_le(room.player_count);
        }
        buf.put_bytes(0, (MAX_ROOM_LIST - count) * RoomSummary::WIRE_SIZE);
        buf.put_u16_le(count as u16);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        let mut rooms = Vec::with_capacity(MAX_ROOM_LIST);
        for _ in 0..MAX_ROOM_LIST {
            rooms.push(RoomSummary {
                room_name: get_fixed_str(body, MAX_ROOM_NAME_LEN),
                player_count: body.get_u16_le(),
            });
        }
        let count = (body.get_u16_le() as usize).min(MAX_ROOM_LIST);
        rooms.truncate(count);
        Self { rooms }
    }
}

/// 채팅 요청 (30)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Packet for ChatRequest {
    const ID: PacketId = PacketId::ReqChat;
    const SIZE: usize = HEADER_SIZE + MAX_MESSAGE_LEN;

    fn encode_body(&self, buf: &mut BytesMut) {
        put_fixed_str(buf, &self.message, MAX_MESSAGE_LEN);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            message: get_fixed_str(body, MAX_MESSAGE_LEN),
        }
    }
}

/// 채팅 알림 (31)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatNotice {
    pub sender_name: String,
    pub message: String,
}

impl ChatNotice {
    pub fn new(sender_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender_name: sender_name.into(),
            message: message.into(),
        }
    }
}

impl Packet for ChatNotice {
    const ID: PacketId = PacketId::NoticeChat;
    const SIZE: usize = HEADER_SIZE + MAX_NAME_LEN + MAX_MESSAGE_LEN;

    fn encode_body(&self, buf: &mut BytesMut) {
        put_fixed_str(buf, &self.sender_name, MAX_NAME_LEN);
        put_fixed_str(buf, &self.message, MAX_MESSAGE_LEN);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            sender_name: get_fixed_str(body, MAX_NAME_LEN),
            message: get_fixed_str(body, MAX_MESSAGE_LEN),
        }
    }
}

/// 플레이어 위치 보고 (40)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerStateRequest {
    pub state: CharacterState,
}

impl PlayerStateRequest {
    pub fn new(pos_x: f32, pos_y: f32) -> Self {
        Self {
            state: CharacterState::new(pos_x, pos_y),
        }
    }
}

impl Packet for PlayerStateRequest {
    const ID: PacketId = PacketId::ReqPlayerState;
    const SIZE: usize = HEADER_SIZE + CharacterState::WIRE_SIZE;

    fn encode_body(&self, buf: &mut BytesMut) {
        self.state.put(buf);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            state: CharacterState::get(body),
        }
    }
}

/// 플레이어 상태 항목
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerStateEntry {
    pub user_id: u32,
    pub state: CharacterState,
}

impl PlayerStateEntry {
    const WIRE_SIZE: usize = 4 + CharacterState::WIRE_SIZE;
}

/// 방 틱마다 전송되는 플레이어 상태 알림 (41)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStateNotice {
    pub players: Vec<PlayerStateEntry>,
}

impl Packet for PlayerStateNotice {
    const ID: PacketId = PacketId::NoticePlayerState;
    const SIZE: usize = HEADER_SIZE + 2 + MAX_PLAYERS_PER_ROOM * PlayerStateEntry::WIRE_SIZE;

    fn encode_body(&self, buf: &mut BytesMut) {
        let count = self.players.len().min(MAX_PLAYERS_PER_ROOM);
        buf.put_u16_le(count as u16);
        for player in &self.players[..count] {
            buf.put_u32_le(player.user_id);
            player.state.put(buf);
        }
        buf.put_bytes(
            0,
            (MAX_PLAYERS_PER_ROOM - count) * PlayerStateEntry::WIRE_SIZE,
        );
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        let count = (body.get_u16_le() as usize).min(MAX_PLAYERS_PER_ROOM);
        let mut players = Vec::with_capacity(count);
        for index in 0..MAX_PLAYERS_PER_ROOM {
            let entry = PlayerStateEntry {
                user_id: body.get_u32_le(),
                state: CharacterState::get(body),
            };
            if index < count {
                players.push(entry);
            }
        }
        Self { players }
    }
}

/// 게임 클리어 알림 (50)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameClearNotice {
    pub winner_name: String,
}

impl Packet for GameClearNotice {
    const ID: PacketId = PacketId::NoticeGameClear;
    const SIZE: usize = HEADER_SIZE + MAX_NAME_LEN;

    fn encode_body(&self, buf: &mut BytesMut) {
        put_fixed_str(buf, &self.winner_name, MAX_NAME_LEN);
    }

    fn decode_body(body: &mut &[u8]) -> Self {
        Self {
            winner_name: get_fixed_str(body, MAX_NAME_LEN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_sizes() {
        assert_eq!(LoginRequest::SIZE, 68);
        assert_eq!(LoginResponse::SIZE, 9);
        assert_eq!(LogoutRequest::SIZE, 36);
        assert_eq!(LogoutResponse::SIZE, 5);
        assert_eq!(CreateRoomRequest::SIZE, 36);
        assert_eq!(EnterRoomResponse::SIZE, 5);
        assert_eq!(RoomInfoNotice::SIZE, 38);
        assert_eq!(RoomListRequest::SIZE, 4);
        assert_eq!(RoomListResponse::SIZE, 346);
        assert_eq!(ChatRequest::SIZE, 132);
        assert_eq!(ChatNotice::SIZE, 164);
        assert_eq!(PlayerStateRequest::SIZE, 12);
        assert_eq!(PlayerStateNotice::SIZE, 198);
        assert_eq!(GameClearNotice::SIZE, 36);
    }

    #[test]
    fn test_encoded_length_matches_size() {
        assert_eq!(LoginResponse::success(7).encode().len(), LoginResponse::SIZE);
        assert_eq!(RoomListResponse::default().encode().len(), RoomListResponse::SIZE);
        assert_eq!(
            PlayerStateNotice::default().encode().len(),
            PlayerStateNotice::SIZE
        );
        assert_eq!(RoomListRequest.encode().len(), HEADER_SIZE);
    }

    #[test]
    fn test_login_response_layout() {
        let bytes = LoginResponse::success(0x0102_0304).encode();
        assert_eq!(&bytes[..], &[11, 0, 9, 0, 0x04, 0x03, 0x02, 0x01, 1]);
    }
}
