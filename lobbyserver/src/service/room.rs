//! 게임 방
//!
//! 정원이 있는 멤버십과, 주기적으로 멤버 위치를 스냅샷해 브로드캐스트하는
//! 독립 틱 태스크를 가집니다. 방마다 락이 하나이며, 락 안에서는 스냅샷만
//! 뜨고 전송은 락을 놓은 뒤에 합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::protocol::{
    ChatNotice, GameClearNotice, Packet, PlayerStateEntry, PlayerStateNotice, RoomInfoNotice,
    MAX_PLAYERS_PER_ROOM,
};
use crate::service::session::Session;
use crate::service::user_service::User;

/// 시스템 알림 발신자 이름
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// 게임 방
pub struct Room {
    room_id: u32,
    name: String,
    capacity: usize,
    tick_interval: Duration,
    members: Mutex<HashMap<u32, Arc<User>>>,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
    ticks: AtomicU64,
}

impl Room {
    /// 방을 만듭니다. 틱은 [`Room::start_tick`]으로 시작합니다.
    pub fn new(room_id: u32, name: impl Into<String>, capacity: usize, tick_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            room_id,
            name: name.into(),
            capacity,
            tick_interval,
            members: Mutex::new(HashMap::new()),
            tick_handle: Mutex::new(None),
            ticks: AtomicU64::new(0),
        })
    }

    pub fn room_id(&self) -> u32 {
        self.room_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn member_count(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.lock().len() >= self.capacity
    }

    pub fn contains(&self, user_id: u32) -> bool {
        self.members.lock().contains_key(&user_id)
    }

    /// 멤버 목록 복사본 (ID 순)
    pub fn members(&self) -> Vec<Arc<User>> {
        let mut members: Vec<_> = self.members.lock().values().cloned().collect();
        members.sort_by_key(|user| user.user_id());
        members
    }

    /// 멤버를 추가합니다.
    ///
    /// 정원이 찼거나 이미 멤버면 `false`. 성공하면 위치를 초기화하고
    /// 입장한 본인을 포함한 모든 멤버에게 방 정보를, 나머지 멤버에게
    /// 시스템 채팅을 보냅니다.
    pub fn add_member(&self, user: &Arc<User>) -> bool {
        let count = {
            let mut members = self.members.lock();
            if members.len() >= self.capacity || members.contains_key(&user.user_id()) {
                return false;
            }
            user.reset_character_state();
            members.insert(user.user_id(), Arc::clone(user));
            members.len()
        };

        info!(
            "사용자 {} 방 '{}' 입장 ({}/{})",
            user.username(),
            self.name,
            count,
            self.capacity
        );

        let notice = ChatNotice::new(SYSTEM_SENDER, format!("{} joined the room.", user.username()));
        self.broadcast(&notice.encode(), Some(user.user_id()));
        self.broadcast_room_info(count);
        true
    }

    /// 멤버를 제거합니다. 멤버가 아니면 `false`.
    ///
    /// 성공하면 위치를 초기화하고 남은 멤버에게 시스템 채팅과 방 정보를 보냅니다.
    pub fn remove_member(&self, user_id: u32) -> bool {
        let (user, count) = {
            let mut members = self.members.lock();
            let Some(user) = members.remove(&user_id) else {
                return false;
            };
            user.reset_character_state();
            (user, members.len())
        };

        info!(
            "사용자 {} 방 '{}' 퇴장 ({}/{})",
            user.username(),
            self.name,
            count,
            self.capacity
        );

        if count > 0 {
            let notice = ChatNotice::new(SYSTEM_SENDER, format!("{} left the room.", user.username()));
            self.broadcast(&notice.encode(), None);
            self.broadcast_room_info(count);
        }
        true
    }

    /// 방 멤버에게 프레임을 보냅니다.
    ///
    /// 오프라인이거나 연결이 없는 멤버, `exclude_user_id`는 건너뜁니다.
    /// 실제 전송 대상 수를 반환합니다.
    pub fn broadcast(&self, frame: &Bytes, exclude_user_id: Option<u32>) -> usize {
        let targets: Vec<Arc<Session>> = {
            let members = self.members.lock();
            members
                .values()
                .filter(|user| Some(user.user_id()) != exclude_user_id)
                .filter_map(|user| user.deliverable_session())
                .collect()
        };

        for session in &targets {
            session.send(frame.clone());
        }
        targets.len()
    }

    fn broadcast_room_info(&self, count: usize) {
        let notice = RoomInfoNotice {
            room_name: self.name.clone(),
            player_count: count as u16,
        };
        self.broadcast(&notice.encode(), None);
    }

    /// 게임 클리어를 방 전체에 알립니다.
    pub fn announce_game_clear(&self, winner_name: &str) -> usize {
        let notice = GameClearNotice {
            winner_name: winner_name.to_string(),
        };
        let sent = self.broadcast(&notice.encode(), None);
        info!("방 '{}' 게임 클리어: 승자 {}", self.name, winner_name);
        sent
    }

    /// 멤버 위치 스냅샷 (ID 순, 최대 [`MAX_PLAYERS_PER_ROOM`]명)
    pub fn player_states(&self) -> Vec<PlayerStateEntry> {
        let mut players: Vec<PlayerStateEntry> = {
            let members = self.members.lock();
            members
                .values()
                .map(|user| PlayerStateEntry {
                    user_id: user.user_id(),
                    state: user.character_state(),
                })
                .collect()
        };
        players.sort_by_key(|player| player.user_id);
        players.truncate(MAX_PLAYERS_PER_ROOM);
        players
    }

    /// 틱 한 번. 빈 방은 스냅샷과 전송을 건너뜁니다.
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);

        let players = self.player_states();
        if players.is_empty() {
            return;
        }

        let notice = PlayerStateNotice { players };
        let sent = self.broadcast(&notice.encode(), None);
        trace!("방 '{}' 틱: {}명에게 상태 전송", self.name, sent);
    }

    /// 지금까지 실행된 틱 수
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// 주기적 틱을 시작합니다. 이미 돌고 있으면 기존 틱을 교체합니다.
    ///
    /// 틱 태스크는 `Weak`만 들고 있어서 방이 사라지면 스스로 끝납니다.
    pub fn start_tick(self: &Arc<Self>, runtime: &Handle) {
        let weak_room = Arc::downgrade(self);
        let period = self.tick_interval;

        let handle = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let Some(room) = weak_room.upgrade() else {
                    break;
                };
                room.tick();
            }
        });

        if let Some(previous) = self.tick_handle.lock().replace(handle) {
            previous.abort();
        }
        debug!("방 '{}' 틱 시작 ({:?} 간격)", self.name, period);
    }

    /// 틱을 멈춥니다. 돌고 있지 않았으면 `false`.
    pub fn stop_tick(&self) -> bool {
        match self.tick_handle.lock().take() {
            Some(handle) => {
                handle.abort();
                debug!("방 '{}' 틱 정지", self.name);
                true
            }
            None => false,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.tick_handle
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Room {
    fn drop(&mut self) {
        if let Some(handle) = self.tick_handle.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("room_id", &self.room_id)
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("members", &self.member_count())
            .finish()
    }
}
