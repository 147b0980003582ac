//! 로비 서버 통합 테스트
//!
//! 127.0.0.1:0에 실제 서버를 띄우고 원시 TCP 클라이언트로 시나리오를 검증합니다.
//! 모든 읽기는 타임아웃으로 보호됩니다.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use lobbyserver::protocol::*;
use lobbyserver::{LobbyServer, LobbyServerConfig, ShutdownHandle};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

struct TestServer {
    server: Arc<LobbyServer>,
    shutdown: ShutdownHandle,
}

impl TestServer {
    async fn start() -> Self {
        let config = LobbyServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            tick_interval_ms: 30,
            stats_interval_secs: 0,
            ..LobbyServerConfig::default()
        };
        let server = Arc::new(LobbyServer::bind(config).await.unwrap());
        let shutdown = server.shutdown_handle();

        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });

        Self { server, shutdown }
    }

    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.server.local_addr()).await.unwrap();
        TestClient {
            stream,
            scratch: BytesMut::new(),
        }
    }

    /// 로그인까지 마친 클라이언트
    async fn login(&self, name: &str) -> (TestClient, u32) {
        let mut client = self.connect().await;
        client.send(&LoginRequest::new(name, "pw")).await;
        let response: LoginResponse = client.expect().await;
        assert!(response.is_success, "{} 로그인 실패", name);
        (client, response.user_id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

struct TestClient {
    stream: TcpStream,
    scratch: BytesMut,
}

impl TestClient {
    async fn send<P: Packet>(&mut self, packet: &P) {
        self.stream.write_all(&packet.encode()).await.unwrap();
    }

    async fn next_frame(&mut self, wait: Duration) -> Option<Frame> {
        match timeout(wait, read_frame(&mut self.stream, &mut self.scratch)).await {
            Ok(Ok(frame)) => Some(frame),
            _ => None,
        }
    }

    /// `P`가 올 때까지 다른 프레임(틱 알림 등)은 건너뜁니다.
    async fn expect<P: Packet>(&mut self) -> P {
        let deadline = Instant::now() + READ_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = self
                .next_frame(remaining)
                .await
                .unwrap_or_else(|| panic!("{:?} 패킷을 받지 못했습니다", P::ID));
            if let Some(packet) = P::decode(&frame) {
                return packet;
            }
        }
    }

    /// 주어진 시간 동안 받은 `P` 패킷을 모두 모읍니다.
    async fn collect_for<P: Packet>(&mut self, window: Duration) -> Vec<P> {
        let deadline = Instant::now() + window;
        let mut packets = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return packets;
            }
            match self.next_frame(remaining).await {
                Some(frame) => packets.extend(P::decode(&frame)),
                None => return packets,
            }
        }
    }

    /// 서버가 연결을 닫으면 `true`. 닫기 전에 받은 데이터는 버립니다.
    async fn closed_by_server(&mut self) -> bool {
        let mut buf = [0u8; 1024];
        let result = timeout(READ_TIMEOUT, async {
            loop {
                match self.stream.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => continue,
                }
            }
        })
        .await;
        result.is_ok()
    }
}

#[tokio::test]
async fn test_login_and_duplicate_login() {
    let server = TestServer::start().await;

    let mut first = server.connect().await;
    first.send(&LoginRequest::new("alice", "x")).await;
    let response: LoginResponse = first.expect().await;
    assert!(response.is_success);
    assert_ne!(response.user_id, 0);

    let mut second = server.connect().await;
    second.send(&LoginRequest::new("alice", "x")).await;
    let response: LoginResponse = second.expect().await;
    assert_eq!(response, LoginResponse::failure());

    // 같은 세션에서 다시 로그인해도 실패
    first.send(&LoginRequest::new("someone", "x")).await;
    let response: LoginResponse = first.expect().await;
    assert!(!response.is_success);

    println!("✅ 로그인 시나리오 통과");
}

#[tokio::test]
async fn test_login_rejects_empty_credentials() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send(&LoginRequest::new("alice", "")).await;
    let response: LoginResponse = client.expect().await;
    assert!(!response.is_success);

    client.send(&LoginRequest::new("", "pw")).await;
    let response: LoginResponse = client.expect().await;
    assert!(!response.is_success);
}

#[tokio::test]
async fn test_create_room_twice() {
    let server = TestServer::start().await;
    let (mut client, _) = server.login("alice").await;

    client.send(&CreateRoomRequest::new("Arena")).await;
    let response: CreateRoomResponse = client.expect().await;
    assert!(response.is_success);

    client.send(&CreateRoomRequest::new("Arena")).await;
    let response: CreateRoomResponse = client.expect().await;
    assert!(!response.is_success);

    // 기본 방 이름도 중복
    client.send(&CreateRoomRequest::new("Lobby")).await;
    let response: CreateRoomResponse = client.expect().await;
    assert!(!response.is_success);
}

#[tokio::test]
async fn test_create_room_rejects_unterminated_name() {
    let server = TestServer::start().await;
    let (mut client, _) = server.login("alice").await;

    // NUL 없이 32바이트를 꽉 채운 이름
    let mut frame = BytesMut::new();
    PacketHeader {
        packet_id: CreateRoomRequest::ID.as_u16(),
        packet_size: CreateRoomRequest::SIZE as u16,
    }
    .encode(&mut frame);
    frame.extend_from_slice(&[b'x'; MAX_ROOM_NAME_LEN]);
    client.stream.write_all(&frame).await.unwrap();

    let response: CreateRoomResponse = client.expect().await;
    assert!(!response.is_success);
    assert!(server
        .server
        .state()
        .rooms
        .get_room_by_name(&"x".repeat(MAX_ROOM_NAME_LEN))
        .is_none());

    // 31바이트는 통지에 그대로 실리므로 허용
    let longest = "x".repeat(MAX_ROOM_NAME_LEN - 1);
    client.send(&CreateRoomRequest::new(longest.as_str())).await;
    assert!(client.expect::<CreateRoomResponse>().await.is_success);

    // 방 정보가 입장 응답보다 먼저 옴
    client.send(&EnterRoomRequest::new(longest.as_str())).await;
    let info: RoomInfoNotice = client.expect().await;
    assert_eq!(info.room_name, longest);
    assert!(client.expect::<EnterRoomResponse>().await.is_success);
}

#[tokio::test]
async fn test_unauthenticated_requests_fail() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send(&CreateRoomRequest::new("Arena")).await;
    let response: CreateRoomResponse = client.expect().await;
    assert!(!response.is_success);

    client.send(&EnterRoomRequest::new("Lobby")).await;
    let response: EnterRoomResponse = client.expect().await;
    assert!(!response.is_success);

    client.send(&LogoutRequest::default()).await;
    let response: LogoutResponse = client.expect().await;
    assert!(!response.is_success);
}

#[tokio::test]
async fn test_room_list_contains_default_rooms() {
    let server = TestServer::start().await;
    let (mut alice, _) = server.login("alice").await;

    alice.send(&EnterRoomRequest::new("Lobby")).await;
    let response: EnterRoomResponse = alice.expect().await;
    assert!(response.is_success);

    alice.send(&RoomListRequest).await;
    let list: RoomListResponse = alice.expect().await;
    assert_eq!(
        list.rooms,
        vec![
            RoomSummary {
                room_name: "Lobby".into(),
                player_count: 1
            },
            RoomSummary {
                room_name: "Room1".into(),
                player_count: 0
            },
        ]
    );
}

#[tokio::test]
async fn test_two_players_receive_each_others_positions() {
    let server = TestServer::start().await;
    let (mut alice, alice_id) = server.login("alice").await;
    let (mut bob, bob_id) = server.login("bob").await;

    alice.send(&CreateRoomRequest::new("Arena")).await;
    assert!(alice.expect::<CreateRoomResponse>().await.is_success);

    alice.send(&EnterRoomRequest::new("Arena")).await;
    assert!(alice.expect::<EnterRoomResponse>().await.is_success);
    bob.send(&EnterRoomRequest::new("Arena")).await;
    assert!(bob.expect::<EnterRoomResponse>().await.is_success);

    alice.send(&PlayerStateRequest::new(1.5, 2.5)).await;
    bob.send(&PlayerStateRequest::new(-3.0, 4.0)).await;

    let mut expected = vec![
        PlayerStateEntry {
            user_id: alice_id,
            state: CharacterState::new(1.5, 2.5),
        },
        PlayerStateEntry {
            user_id: bob_id,
            state: CharacterState::new(-3.0, 4.0),
        },
    ];
    expected.sort_by_key(|entry| entry.user_id);

    for client in [&mut alice, &mut bob] {
        let deadline = Instant::now() + READ_TIMEOUT;
        loop {
            assert!(Instant::now() < deadline, "위치가 반영된 틱을 받지 못했습니다");
            let notice: PlayerStateNotice = client.expect().await;
            if notice.players.len() == 2 && notice.players == expected {
                break;
            }
        }
    }
}

#[tokio::test]
async fn test_join_notifications_and_chat() {
    let server = TestServer::start().await;
    let (mut alice, _) = server.login("alice").await;
    let (mut bob, _) = server.login("bob").await;

    alice.send(&EnterRoomRequest::new("Room1")).await;
    let info: RoomInfoNotice = alice.expect().await;
    assert_eq!(info.player_count, 1);
    assert!(alice.expect::<EnterRoomResponse>().await.is_success);

    bob.send(&EnterRoomRequest::new("Room1")).await;
    let system: ChatNotice = alice.expect().await;
    assert_eq!(system.sender_name, "SYSTEM");
    assert_eq!(system.message, "bob joined the room.");
    let info: RoomInfoNotice = alice.expect().await;
    assert_eq!(info.player_count, 2);

    bob.send(&ChatRequest::new("hello everyone")).await;
    let chat: ChatNotice = alice.expect().await;
    assert_eq!(chat, ChatNotice::new("bob", "hello everyone"));
    let echo: ChatNotice = bob.expect().await;
    assert_eq!(echo.sender_name, "bob");
}

#[tokio::test]
async fn test_room_capacity_enforced() {
    let server = TestServer::start().await;

    // Room1 정원 4
    let mut clients = Vec::new();
    for i in 0..4 {
        let (mut client, _) = server.login(&format!("p{}", i)).await;
        client.send(&EnterRoomRequest::new("Room1")).await;
        assert!(client.expect::<EnterRoomResponse>().await.is_success);
        clients.push(client);
    }

    let (mut late, _) = server.login("late").await;
    late.send(&EnterRoomRequest::new("Room1")).await;
    assert!(!late.expect::<EnterRoomResponse>().await.is_success);
}

#[tokio::test]
async fn test_disconnect_removes_user_from_rooms() {
    let server = TestServer::start().await;
    let (mut alice, _) = server.login("alice").await;
    let (mut bob, bob_id) = server.login("bob").await;

    for name in ["Arena", "Second"] {
        alice.send(&CreateRoomRequest::new(name)).await;
        assert!(alice.expect::<CreateRoomResponse>().await.is_success);
    }

    alice.send(&EnterRoomRequest::new("Arena")).await;
    assert!(alice.expect::<EnterRoomResponse>().await.is_success);
    bob.send(&EnterRoomRequest::new("Arena")).await;
    assert!(bob.expect::<EnterRoomResponse>().await.is_success);
    bob.send(&EnterRoomRequest::new("Second")).await;
    assert!(bob.expect::<EnterRoomResponse>().await.is_success);

    // bob 입장 알림까지 소비
    loop {
        let info: RoomInfoNotice = alice.expect().await;
        if info.player_count == 2 {
            break;
        }
    }

    drop(bob);

    let notices: Vec<RoomInfoNotice> = alice.collect_for(Duration::from_millis(500)).await;
    assert_eq!(
        notices,
        vec![RoomInfoNotice {
            room_name: "Arena".into(),
            player_count: 1
        }]
    );

    let state = server.server.state();
    assert!(!state.rooms.get_room_by_name("Arena").unwrap().contains(bob_id));
    assert!(state.rooms.get_room_by_name("Second").unwrap().is_empty());
    assert!(!state.users.get_user(bob_id).unwrap().is_online());
    assert_eq!(state.sessions.session_count(), 1);
}

#[tokio::test]
async fn test_logout_then_actions_fail() {
    let server = TestServer::start().await;
    let (mut alice, alice_id) = server.login("alice").await;

    alice.send(&EnterRoomRequest::new("Lobby")).await;
    assert!(alice.expect::<EnterRoomResponse>().await.is_success);

    alice.send(&LogoutRequest::default()).await;
    assert!(alice.expect::<LogoutResponse>().await.is_success);

    let state = server.server.state();
    assert!(state.rooms.get_room_by_name("Lobby").unwrap().is_empty());
    assert!(!state.users.get_user(alice_id).unwrap().is_online());

    alice.send(&CreateRoomRequest::new("After")).await;
    assert!(!alice.expect::<CreateRoomResponse>().await.is_success);

    // 로그아웃해도 사용자는 남아 있으므로 같은 이름으로 다시 로그인할 수 없음
    alice.send(&LoginRequest::new("alice", "x")).await;
    assert!(!alice.expect::<LoginResponse>().await.is_success);
}

#[tokio::test]
async fn test_oversized_header_closes_connection() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    // size = 513 > MAX_PACKET_SIZE
    let size = (MAX_PACKET_SIZE as u16 + 1).to_le_bytes();
    client
        .stream
        .write_all(&[10, 0, size[0], size[1]])
        .await
        .unwrap();

    let mut buf = [0u8; 16];
    let read = timeout(READ_TIMEOUT, client.stream.read(&mut buf)).await;
    assert!(matches!(read, Ok(Ok(0)) | Ok(Err(_))), "응답 없이 닫혀야 합니다");
}

#[tokio::test]
async fn test_unknown_packet_keeps_connection() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    let mut unknown = BytesMut::new();
    PacketHeader {
        packet_id: 999,
        packet_size: HEADER_SIZE as u16,
    }
    .encode(&mut unknown);
    client.stream.write_all(&unknown).await.unwrap();

    client.send(&RoomListRequest).await;
    let list: RoomListResponse = client.expect().await;
    assert_eq!(list.rooms.len(), 2);
    assert_eq!(server.server.stats().dispatch.unknown_packets, 1);
}

#[tokio::test]
async fn test_stop_disconnects_everyone() {
    let server = TestServer::start().await;
    let (mut alice, _) = server.login("alice").await;
    let mut anonymous = server.connect().await;
    // 등록이 끝났는지 왕복으로 확인
    anonymous.send(&RoomListRequest).await;
    let _: RoomListResponse = anonymous.expect().await;

    server.server.stop();

    assert!(alice.closed_by_server().await);
    assert!(anonymous.closed_by_server().await);
    assert!(server
        .server
        .state()
        .rooms
        .list_rooms()
        .iter()
        .all(|room| !room.is_ticking()));
}
