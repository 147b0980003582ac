//! 클라이언트 세션
//!
//! 소켓 하나를 소유하며 읽기 루프(헤더 → 본문 → 디스패치)와
//! 단일 비행(single-flight) 쓰기 큐를 관리합니다.
//!
//! # 쓰기 규칙
//!
//! - 프레임은 락 안에서 FIFO에 추가됩니다.
//! - 진행 중인 쓰기가 없을 때 추가한 호출자만 드레인 태스크를 띄웁니다.
//! - 드레인은 맨 앞 프레임을 다 쓴 뒤에만 꺼내고, 큐가 비면 플래그를 내립니다.
//!
//! 따라서 연결당 쓰기는 최대 하나이며 프레임은 섞이지 않고 추가 순서대로 나갑니다.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, trace, warn};

use crate::handler::PacketDispatcher;
use crate::protocol::{self, Packet, MAX_PACKET_SIZE};
use crate::tool::error::{ErrorHandler, ErrorSeverity, LobbyError, LobbyResult};

/// 세션 종료 시 정확히 한 번 호출되는 콜백
///
/// 시작된 세션은 읽기 루프가 마지막 디스패치를 끝낸 뒤에 호출하므로
/// 콜백 이후에 실행되는 핸들러는 없습니다.
pub type DisconnectHook = Arc<dyn Fn(&Arc<Session>) + Send + Sync>;

#[derive(Debug, Default)]
struct WriteQueue {
    frames: VecDeque<Bytes>,
    in_flight: bool,
}

/// 클라이언트 연결 하나
pub struct Session {
    session_id: u64,
    peer_addr: SocketAddr,
    runtime: Handle,

    reader: Mutex<Option<OwnedReadHalf>>,
    writer: AsyncMutex<Option<OwnedWriteHalf>>,
    write_queue: Mutex<WriteQueue>,

    /// 종료 신호. 진행 중인 읽기/쓰기를 깨웁니다.
    closed: watch::Sender<bool>,
    disconnected: AtomicBool,
    on_disconnect: Mutex<Option<DisconnectHook>>,

    authenticated: AtomicBool,
    user_id: AtomicU32,

    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    connected_at: Instant,
}

impl Session {
    /// 수락된 소켓으로 세션을 만듭니다. 읽기 루프는 [`Session::start`]에서 시작합니다.
    pub fn new(
        session_id: u64,
        stream: TcpStream,
        runtime: Handle,
        on_disconnect: DisconnectHook,
    ) -> LobbyResult<Arc<Self>> {
        let peer_addr = stream.peer_addr()?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("세션 {} TCP_NODELAY 설정 실패: {}", session_id, e);
        }
        let (reader, writer) = stream.into_split();
        let (closed, _) = watch::channel(false);

        Ok(Arc::new(Self {
            session_id,
            peer_addr,
            runtime,
            reader: Mutex::new(Some(reader)),
            writer: AsyncMutex::new(Some(writer)),
            write_queue: Mutex::new(WriteQueue::default()),
            closed,
            disconnected: AtomicBool::new(false),
            on_disconnect: Mutex::new(Some(on_disconnect)),
            authenticated: AtomicBool::new(false),
            user_id: AtomicU32::new(0),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            connected_at: Instant::now(),
        }))
    }

    /// 읽기 루프를 시작합니다. 두 번째 호출은 에러입니다.
    pub fn start(self: &Arc<Self>, dispatcher: Arc<PacketDispatcher>) -> LobbyResult<()> {
        let reader = self.reader.lock().take().ok_or_else(|| {
            LobbyError::internal(
                "Session",
                format!("세션 {}의 읽기 루프가 이미 시작되었습니다", self.session_id),
            )
        })?;

        let session = Arc::clone(self);
        self.runtime.spawn(session.read_loop(reader, dispatcher));
        debug!("세션 {} 읽기 루프 시작 ({})", self.session_id, self.peer_addr);
        Ok(())
    }

    async fn read_loop(self: Arc<Self>, mut reader: OwnedReadHalf, dispatcher: Arc<PacketDispatcher>) {
        let mut closed = self.closed.subscribe();
        let mut scratch = BytesMut::with_capacity(MAX_PACKET_SIZE);

        loop {
            let result = tokio::select! {
                biased;
                _ = closed.wait_for(|closed| *closed) => break,
                result = protocol::read_frame(&mut reader, &mut scratch) => result,
            };

            match result {
                Ok(frame) => {
                    if self.is_disconnected() {
                        break;
                    }
                    self.frames_received.fetch_add(1, Ordering::Relaxed);
                    trace!(
                        "세션 {} 수신: id={} size={}",
                        self.session_id,
                        frame.packet_id(),
                        frame.len()
                    );
                    dispatcher.dispatch(&self, &frame);
                }
                Err(LobbyError::ConnectionClosed) => {
                    info!("세션 {} 상대방 연결 종료 ({})", self.session_id, self.peer_addr);
                    break;
                }
                Err(e) => {
                    let severity = if e.is_protocol_violation() {
                        ErrorSeverity::Warning
                    } else {
                        ErrorSeverity::Info
                    };
                    ErrorHandler::handle_error(&e, severity, "Session", "read_frame");
                    break;
                }
            }
        }

        self.disconnect();
        self.run_disconnect_hook();
    }

    /// 프레임을 비동기 전송 큐에 넣습니다.
    ///
    /// 어느 스레드/태스크에서든 동시에 호출할 수 있습니다.
    /// [`MAX_PACKET_SIZE`]보다 큰 프레임은 로그를 남기고 버립니다.
    pub fn send(self: &Arc<Self>, frame: Bytes) {
        if self.is_disconnected() {
            return;
        }

        if frame.len() > MAX_PACKET_SIZE {
            let error = LobbyError::FrameTooLarge {
                size: frame.len(),
                max: MAX_PACKET_SIZE,
            };
            ErrorHandler::handle_error(&error, ErrorSeverity::Warning, "Session", "send");
            return;
        }

        let should_drain = {
            let mut queue = self.write_queue.lock();
            queue.frames.push_back(frame);
            if queue.in_flight {
                false
            } else {
                queue.in_flight = true;
                true
            }
        };

        if should_drain {
            let session = Arc::clone(self);
            self.runtime.spawn(session.drain_write_queue());
        }
    }

    /// 패킷을 인코딩해 전송합니다.
    pub fn send_packet<P: Packet>(self: &Arc<Self>, packet: &P) {
        self.send(packet.encode());
    }

    async fn drain_write_queue(self: Arc<Self>) {
        let mut closed = self.closed.subscribe();

        loop {
            let frame = {
                let mut queue = self.write_queue.lock();
                match queue.frames.front() {
                    Some(frame) => frame.clone(),
                    None => {
                        queue.in_flight = false;
                        return;
                    }
                }
            };

            let written = tokio::select! {
                _ = closed.wait_for(|closed| *closed) => return,
                result = self.write_frame(&frame) => result,
            };

            if let Err(e) = written {
                ErrorHandler::handle_error(&e, ErrorSeverity::Info, "Session", "write_frame");
                self.disconnect();
                return;
            }
            self.frames_sent.fetch_add(1, Ordering::Relaxed);

            let mut queue = self.write_queue.lock();
            queue.frames.pop_front();
            if queue.frames.is_empty() {
                queue.in_flight = false;
                return;
            }
        }
    }

    async fn write_frame(&self, frame: &Bytes) -> LobbyResult<()> {
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(writer) => {
                writer.write_all(frame).await?;
                Ok(())
            }
            None => Err(LobbyError::ConnectionClosed),
        }
    }

    /// 연결을 종료합니다.
    ///
    /// 여러 번, 여러 곳에서 동시에 호출해도 안전합니다. 처음 호출한 쪽만
    /// 소켓을 닫습니다. 종료 콜백은 읽기 루프가 진행 중인 디스패치를 마친 뒤
    /// 실행하고, 읽기 루프를 시작하지 않은 세션이면 여기서 바로 실행합니다.
    pub fn disconnect(self: &Arc<Self>) {
        if self
            .disconnected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.closed.send_replace(true);

        // 읽기 반쪽이 남아 있으면 읽기 루프가 없음
        let never_started = self.reader.lock().take().is_some();

        let dropped = {
            let mut queue = self.write_queue.lock();
            let dropped = queue.frames.len();
            queue.frames.clear();
            dropped
        };
        if dropped > 0 {
            debug!("세션 {} 미전송 프레임 {}개 폐기", self.session_id, dropped);
        }

        let session = Arc::clone(self);
        self.runtime.spawn(async move {
            let mut writer = session.writer.lock().await;
            if let Some(mut writer) = writer.take() {
                if let Err(e) = writer.shutdown().await {
                    debug!("세션 {} 소켓 shutdown 실패: {}", session.session_id, e);
                }
            }
        });

        info!(
            "세션 {} 연결 해제 ({}, 수신 {} / 송신 {} 프레임)",
            self.session_id,
            self.peer_addr,
            self.frames_received(),
            self.frames_sent()
        );

        if never_started {
            self.run_disconnect_hook();
        }
    }

    fn run_disconnect_hook(self: &Arc<Self>) {
        let hook = self.on_disconnect.lock().take();
        match hook {
            Some(hook) => hook(self),
            None => warn!("세션 {} 종료 콜백이 없습니다", self.session_id),
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// 인증 상태와 바인딩된 사용자를 함께 설정합니다.
    pub fn authenticate(&self, user_id: u32) {
        self.user_id.store(user_id, Ordering::Release);
        self.authenticated.store(true, Ordering::Release);
    }

    /// 인증을 해제합니다. 연결은 유지됩니다.
    pub fn clear_authentication(&self) {
        self.authenticated.store(false, Ordering::Release);
        self.user_id.store(0, Ordering::Release);
    }

    /// 바인딩된 사용자 ID (인증 전에는 0)
    pub fn user_id(&self) -> u32 {
        self.user_id.load(Ordering::Acquire)
    }

    pub fn pending_frames(&self) -> usize {
        self.write_queue.lock().frames.len()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("peer_addr", &self.peer_addr)
            .field("authenticated", &self.is_authenticated())
            .field("user_id", &self.user_id())
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}
