//! 패킷 디스패처
//!
//! 시작 시 한 번 구성되는 `PacketId → 핸들러` 맵입니다.
//! 알 수 없는 ID와 크기가 모자란 프레임은 버리고 카운터만 올립니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::protocol::{Frame, Packet, PacketId};
use crate::service::session::Session;
use crate::tool::SimpleUtils;

/// 원시 프레임 핸들러
pub type PacketHandlerFn = Box<dyn Fn(&Arc<Session>, &Frame) + Send + Sync>;

#[derive(Debug, Default)]
struct DispatchCounters {
    dispatched: AtomicU64,
    unknown_packets: AtomicU64,
    undersized_frames: AtomicU64,
}

/// 디스패치 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub unknown_packets: u64,
    pub undersized_frames: u64,
}

/// 패킷 디스패처
pub struct PacketDispatcher {
    handlers: HashMap<u16, PacketHandlerFn>,
    counters: Arc<DispatchCounters>,
}

impl Default for PacketDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            counters: Arc::new(DispatchCounters::default()),
        }
    }

    /// 원시 프레임 핸들러 등록. 같은 ID를 다시 등록하면 교체됩니다.
    pub fn register_handler<F>(&mut self, packet_id: PacketId, handler: F)
    where
        F: Fn(&Arc<Session>, &Frame) + Send + Sync + 'static,
    {
        if self.handlers.insert(packet_id.as_u16(), Box::new(handler)).is_some() {
            warn!("패킷 핸들러 교체: {:?}", packet_id);
        }
        debug!("패킷 핸들러 등록: {:?}", packet_id);
    }

    /// 타입 지정 핸들러 등록
    ///
    /// 프레임을 `P`로 디코딩한 뒤 호출합니다. `P::SIZE`보다 짧은 프레임은
    /// 조용히 무시됩니다.
    pub fn register<P, F>(&mut self, handler: F)
    where
        P: Packet + 'static,
        F: Fn(&Arc<Session>, P) + Send + Sync + 'static,
    {
        let counters = Arc::clone(&self.counters);
        self.register_handler(P::ID, move |session, frame| match P::decode(frame) {
            Some(packet) => handler(session, packet),
            None => {
                counters.undersized_frames.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "세션 {} 크기 부족 프레임 무시: {:?} {}바이트 (필요 {}바이트)",
                    session.session_id(),
                    P::ID,
                    frame.len(),
                    P::SIZE
                );
            }
        });
    }

    /// 프레임을 등록된 핸들러로 보냅니다.
    pub fn dispatch(&self, session: &Arc<Session>, frame: &Frame) {
        match self.handlers.get(&frame.packet_id()) {
            Some(handler) => {
                self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
                handler(session, frame);
            }
            None => {
                self.counters.unknown_packets.fetch_add(1, Ordering::Relaxed);
                let head = &frame.as_bytes()[..frame.len().min(16)];
                warn!(
                    "세션 {} 알 수 없는 패킷 ID {} ({}바이트, {}) 무시",
                    session.session_id(),
                    frame.packet_id(),
                    frame.len(),
                    SimpleUtils::bytes_to_hex(head)
                );
            }
        }
    }

    pub fn has_handler(&self, packet_id: PacketId) -> bool {
        self.handlers.contains_key(&packet_id.as_u16())
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            unknown_packets: self.counters.unknown_packets.load(Ordering::Relaxed),
            undersized_frames: self.counters.undersized_frames.load(Ordering::Relaxed),
        }
    }
}
