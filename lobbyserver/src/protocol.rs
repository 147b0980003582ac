//! 로비 서버 바이너리 프로토콜 정의
//!
//! 클라이언트와 서버 간 통신을 위한 고정 크기 바이너리 패킷을 정의합니다.
//!
//! # 프레임 구조
//!
//! ```text
//! [packet_id: u16 LE][packet_size: u16 LE][본문 (packet_size - 4)바이트]
//! ```
//!
//! `packet_size`는 헤더를 포함한 전체 프레임 크기이며
//! `HEADER_SIZE ..= MAX_PACKET_SIZE` 범위를 벗어나면 연결을 끊습니다.
//!
//! 모든 정수는 리틀 엔디언, `f32`는 IEEE-754, `bool`은 1바이트이며
//! 구조체 사이에 패딩은 없습니다. 고정 길이 문자열은 NUL 종료 문자열입니다.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::tool::error::{LobbyError, LobbyResult};

pub mod packets;

pub use packets::*;

/// 기본 리스닝 포트
pub const PORT_NUMBER: u16 = 31452;
/// 헤더를 포함한 최대 프레임 크기
pub const MAX_PACKET_SIZE: usize = 512;
/// 헤더 크기 (packet_id + packet_size)
pub const HEADER_SIZE: usize = 4;

pub const MAX_ID_LEN: usize = 32;
pub const MAX_PW_LEN: usize = 32;
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_ROOM_NAME_LEN: usize = 32;
pub const MAX_MESSAGE_LEN: usize = 128;

/// 플레이어 상태 브로드캐스트 한 번에 담기는 최대 인원
pub const MAX_PLAYERS_PER_ROOM: usize = 16;
/// 방 목록 응답에 담기는 최대 방 개수
pub const MAX_ROOM_LIST: usize = 10;

/// 패킷 ID
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketId {
    ReqLogin = 10,
    ResLogin = 11,
    ReqLogout = 12,
    ResLogout = 13,

    ReqCreateRoom = 20,
    ResCreateRoom = 21,
    ReqEnterRoom = 22,
    ResEnterRoom = 23,
    ReqLeaveRoom = 24,
    ResLeaveRoom = 25,
    NoticeRoomInfo = 26,
    ResRoomList = 27,
    ReqRoomList = 28,

    ReqChat = 30,
    NoticeChat = 31,

    ReqPlayerState = 40,
    NoticePlayerState = 41,

    NoticeGameClear = 50,
}

impl PacketId {
    /// 와이어 값으로부터 패킷 ID를 찾습니다. 알 수 없는 값이면 `None`.
    pub fn from_u16(value: u16) -> Option<Self> {
        let id = match value {
            10 => Self::ReqLogin,
            11 => Self::ResLogin,
            12 => Self::ReqLogout,
            13 => Self::ResLogout,
            20 => Self::ReqCreateRoom,
            21 => Self::ResCreateRoom,
            22 => Self::ReqEnterRoom,
            23 => Self::ResEnterRoom,
            24 => Self::ReqLeaveRoom,
            25 => Self::ResLeaveRoom,
            26 => Self::NoticeRoomInfo,
            27 => Self::ResRoomList,
            28 => Self::ReqRoomList,
            30 => Self::ReqChat,
            31 => Self::NoticeChat,
            40 => Self::ReqPlayerState,
            41 => Self::NoticePlayerState,
            50 => Self::NoticeGameClear,
            _ => return None,
        };
        Some(id)
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// 패킷 헤더
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_id: u16,
    /// 헤더 포함 전체 크기
    pub packet_size: u16,
}

impl PacketHeader {
    pub fn new(packet_id: PacketId, packet_size: usize) -> Self {
        Self {
            packet_id: packet_id.as_u16(),
            packet_size: packet_size as u16,
        }
    }

    pub fn decode(raw: [u8; HEADER_SIZE]) -> Self {
        Self {
            packet_id: u16::from_le_bytes([raw[0], raw[1]]),
            packet_size: u16::from_le_bytes([raw[2], raw[3]]),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.packet_id);
        buf.put_u16_le(self.packet_size);
    }

    /// 선언된 크기가 허용 범위 안인지 검사합니다.
    pub fn validate(&self) -> LobbyResult<()> {
        let size = self.packet_size as usize;
        if !(HEADER_SIZE..=MAX_PACKET_SIZE).contains(&size) {
            return Err(LobbyError::InvalidPacketSize {
                size,
                min: HEADER_SIZE,
                max: MAX_PACKET_SIZE,
            });
        }
        Ok(())
    }

    pub fn body_len(&self) -> usize {
        (self.packet_size as usize).saturating_sub(HEADER_SIZE)
    }
}

/// 검증이 끝난 완전한 프레임 (헤더 포함)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: PacketHeader,
    bytes: Bytes,
}

impl Frame {
    /// 원시 바이트로부터 프레임을 만듭니다.
    ///
    /// 헤더 범위와 선언 크기 == 실제 길이를 모두 검사합니다.
    pub fn from_bytes(bytes: Bytes) -> LobbyResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(LobbyError::SizeMismatch {
                declared: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let header = PacketHeader::decode([bytes[0], bytes[1], bytes[2], bytes[3]]);
        header.validate()?;
        Self::assemble(header, bytes)
    }

    fn assemble(header: PacketHeader, bytes: Bytes) -> LobbyResult<Self> {
        let declared = header.packet_size as usize;
        if bytes.len() != declared {
            return Err(LobbyError::SizeMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        Ok(Self { header, bytes })
    }

    pub fn header(&self) -> PacketHeader {
        self.header
    }

    pub fn packet_id(&self) -> u16 {
        self.header.packet_id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn body(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// 스트림에서 프레임 하나를 읽습니다.
///
/// 1. 헤더 4바이트를 정확히 읽고
/// 2. 크기를 검증한 뒤에만
/// 3. 본문을 읽고
/// 4. 조립된 길이를 다시 검증합니다.
///
/// 헤더 경계에서 EOF를 만나면 [`LobbyError::ConnectionClosed`]를 반환합니다.
/// `scratch`는 연결마다 하나씩 재사용하는 읽기 버퍼입니다.
pub async fn read_frame<R>(reader: &mut R, scratch: &mut BytesMut) -> LobbyResult<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut raw = [0u8; HEADER_SIZE];
    if let Err(e) = reader.read_exact(&mut raw).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => LobbyError::ConnectionClosed,
            _ => LobbyError::Io(e),
        });
    }

    let header = PacketHeader::decode(raw);
    header.validate()?;

    let size = header.packet_size as usize;
    scratch.clear();
    scratch.reserve(size);
    scratch.extend_from_slice(&raw);
    scratch.resize(size, 0);
    reader.read_exact(&mut scratch[HEADER_SIZE..]).await?;

    Frame::assemble(header, scratch.split().freeze())
}

/// 고정 크기 패킷 공통 인터페이스
///
/// `SIZE`는 헤더를 포함한 전체 크기입니다. `encode`는 항상 정확히
/// `SIZE` 바이트를 만들고, `decode`는 패킷 ID가 다르거나 프레임이
/// `SIZE`보다 짧으면 `None`을 반환합니다.
pub trait Packet: Sized {
    const ID: PacketId;
    const SIZE: usize;

    fn encode_body(&self, buf: &mut BytesMut);

    /// `body`는 최소 `SIZE - HEADER_SIZE` 바이트가 보장됩니다.
    fn decode_body(body: &mut &[u8]) -> Self;

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        PacketHeader::new(Self::ID, Self::SIZE).encode(&mut buf);
        self.encode_body(&mut buf);
        debug_assert_eq!(buf.len(), Self::SIZE);
        buf.freeze()
    }

    fn decode(frame: &Frame) -> Option<Self> {
        if frame.packet_id() != Self::ID.as_u16() || frame.len() < Self::SIZE {
            return None;
        }
        let mut body = frame.body();
        Some(Self::decode_body(&mut body))
    }
}

/// 고정 길이 NUL 종료 문자열을 씁니다.
///
/// `width - 1` 바이트를 넘으면 UTF-8 문자 경계에서 잘라내고
/// 나머지는 0으로 채웁니다.
pub fn put_fixed_str(buf: &mut BytesMut, value: &str, width: usize) {
    let max = width.saturating_sub(1);
    let mut end = value.len().min(max);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    buf.put_slice(&value.as_bytes()[..end]);
    buf.put_bytes(0, width - end);
}

/// 고정 길이 문자열을 읽습니다.
///
/// 첫 NUL에서 멈추고, NUL이 없으면 `width` 바이트 전체를 사용합니다.
/// 잘못된 UTF-8은 대체 문자로 바뀝니다.
pub fn get_fixed_str(buf: &mut &[u8], width: usize) -> String {
    let raw = &buf[..width];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    let value = String::from_utf8_lossy(&raw[..end]).into_owned();
    buf.advance(width);
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = PacketHeader::new(PacketId::ReqLogin, LoginRequest::SIZE);
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(&buf[..], &[10, 0, 68, 0]);
        assert_eq!(PacketHeader::decode([10, 0, 68, 0]), header);
        assert_eq!(header.body_len(), 64);
    }

    #[test]
    fn test_header_validate_bounds() {
        let mut header = PacketHeader {
            packet_id: 28,
            packet_size: HEADER_SIZE as u16,
        };
        assert!(header.validate().is_ok());
        header.packet_size = MAX_PACKET_SIZE as u16;
        assert!(header.validate().is_ok());
        header.packet_size = MAX_PACKET_SIZE as u16 + 1;
        assert!(header.validate().is_err());
        header.packet_size = 3;
        assert!(header.validate().is_err());
    }

    #[test]
    fn test_packet_id_lookup() {
        assert_eq!(PacketId::from_u16(41), Some(PacketId::NoticePlayerState));
        assert_eq!(PacketId::from_u16(0), None);
        assert_eq!(PacketId::from_u16(999), None);
        assert_eq!(PacketId::NoticeGameClear.as_u16(), 50);
    }
}
