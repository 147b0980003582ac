//! 방 레지스트리
//!
//! 방 생성/조회/삭제를 담당합니다. 이름 중복 검사와 삽입은 하나의 락 구간에서
//! 수행되므로 같은 이름의 방이 동시에 두 개 생길 수 없습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::info;

use crate::service::room::Room;

/// 방 레지스트리
pub struct RoomService {
    rooms: RwLock<HashMap<u32, Arc<Room>>>,
    next_room_id: AtomicU32,
    tick_interval: Duration,
    runtime: Handle,
}

impl RoomService {
    pub fn new(tick_interval: Duration, runtime: Handle) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            next_room_id: AtomicU32::new(1),
            tick_interval,
            runtime,
        }
    }

    /// 방을 만들고 틱을 시작합니다. 같은 이름의 방이 있으면 `None`.
    pub fn create_room(&self, name: &str, capacity: usize) -> Option<Arc<Room>> {
        let room = {
            let mut rooms = self.rooms.write();
            if rooms.values().any(|room| room.name() == name) {
                return None;
            }
            let room_id = self.next_room_id.fetch_add(1, Ordering::Relaxed);
            let room = Room::new(room_id, name, capacity, self.tick_interval);
            rooms.insert(room_id, Arc::clone(&room));
            room
        };

        room.start_tick(&self.runtime);
        info!(
            "🏠 방 생성: '{}' (ID {}, 정원 {})",
            room.name(),
            room.room_id(),
            room.capacity()
        );
        Some(room)
    }

    pub fn get_room(&self, room_id: u32) -> Option<Arc<Room>> {
        self.rooms.read().get(&room_id).cloned()
    }

    pub fn get_room_by_name(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms
            .read()
            .values()
            .find(|room| room.name() == name)
            .cloned()
    }

    /// 방을 삭제하고 틱을 멈춥니다.
    pub fn remove_room(&self, room_id: u32) -> bool {
        let removed = self.rooms.write().remove(&room_id);
        match removed {
            Some(room) => {
                room.stop_tick();
                info!("방 삭제: '{}' (ID {})", room.name(), room_id);
                true
            }
            None => false,
        }
    }

    /// 현재 시점의 방 목록 복사본 (ID 순)
    pub fn list_rooms(&self) -> Vec<Arc<Room>> {
        let mut rooms: Vec<_> = self.rooms.read().values().cloned().collect();
        rooms.sort_by_key(|room| room.room_id());
        rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// 빈 방을 모두 삭제합니다. 삭제된 방 수를 반환합니다.
    pub fn cleanup_empty_rooms(&self) -> usize {
        let removed: Vec<Arc<Room>> = {
            let mut rooms = self.rooms.write();
            let empty_ids: Vec<u32> = rooms
                .iter()
                .filter(|(_, room)| room.is_empty())
                .map(|(room_id, _)| *room_id)
                .collect();
            empty_ids
                .into_iter()
                .filter_map(|room_id| rooms.remove(&room_id))
                .collect()
        };

        for room in &removed {
            room.stop_tick();
        }
        if !removed.is_empty() {
            info!("빈 방 {}개 정리", removed.len());
        }
        removed.len()
    }

    /// 사용자를 모든 방에서 제거합니다. 나간 방 수를 반환합니다.
    pub fn remove_user_from_all(&self, user_id: u32) -> usize {
        self.list_rooms()
            .iter()
            .filter(|room| room.remove_member(user_id))
            .count()
    }

    /// 모든 방의 틱을 멈춥니다.
    pub fn shutdown(&self) {
        let rooms = self.list_rooms();
        for room in &rooms {
            room.stop_tick();
        }
        info!("방 {}개 틱 정지", rooms.len());
    }
}
