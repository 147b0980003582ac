//! 사용자와 사용자 레지스트리
//!
//! 사용자는 첫 로그인 시 생성되며 로그아웃은 오프라인 표시만 합니다.
//! 연결과의 바인딩은 `Weak`이므로 연결이 사라지면 언제든 "없음"이 됩니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::protocol::CharacterState;
use crate::service::session::Session;

/// 사용자
#[derive(Debug)]
pub struct User {
    user_id: u32,
    username: String,
    online: AtomicBool,
    session: Mutex<Weak<Session>>,
    state: Mutex<CharacterState>,
}

impl User {
    pub fn new(user_id: u32, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            online: AtomicBool::new(false),
            session: Mutex::new(Weak::new()),
            state: Mutex::new(CharacterState::default()),
        }
    }

    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    pub fn bind_session(&self, session: &Arc<Session>) {
        *self.session.lock() = Arc::downgrade(session);
    }

    pub fn unbind_session(&self) {
        *self.session.lock() = Weak::new();
    }

    /// 바인딩된 연결. 이미 사라졌으면 `None`.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.lock().upgrade()
    }

    /// 메시지를 받을 수 있는 연결 (온라인 + 살아있는 연결)
    pub fn deliverable_session(&self) -> Option<Arc<Session>> {
        if !self.is_online() {
            return None;
        }
        self.session().filter(|session| !session.is_disconnected())
    }

    pub fn character_state(&self) -> CharacterState {
        *self.state.lock()
    }

    pub fn set_character_state(&self, state: CharacterState) {
        *self.state.lock() = state;
    }

    pub fn reset_character_state(&self) {
        *self.state.lock() = CharacterState::default();
    }
}

/// 사용자 레지스트리
pub struct UserService {
    users: RwLock<HashMap<u32, Arc<User>>>,
    next_user_id: AtomicU32,
}

impl Default for UserService {
    fn default() -> Self {
        Self::new()
    }
}

impl UserService {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_user_id: AtomicU32::new(1),
        }
    }

    /// 새 사용자를 만듭니다. 이름이 이미 있으면 `None`.
    ///
    /// 이름 중복 검사와 삽입은 하나의 락 구간에서 수행됩니다.
    pub fn create_user(&self, username: &str) -> Option<Arc<User>> {
        let user = {
            let mut users = self.users.write();
            if users.values().any(|user| user.username() == username) {
                return None;
            }
            let user_id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
            let user = Arc::new(User::new(user_id, username));
            users.insert(user_id, Arc::clone(&user));
            user
        };

        info!("사용자 생성: {} (ID {})", user.username(), user.user_id());
        Some(user)
    }

    pub fn get_user(&self, user_id: u32) -> Option<Arc<User>> {
        self.users.read().get(&user_id).cloned()
    }

    pub fn get_user_by_name(&self, username: &str) -> Option<Arc<User>> {
        self.users
            .read()
            .values()
            .find(|user| user.username() == username)
            .cloned()
    }

    pub fn remove_user(&self, user_id: u32) -> bool {
        self.users.write().remove(&user_id).is_some()
    }

    /// 현재 시점의 사용자 목록 복사본 (ID 순)
    pub fn list_users(&self) -> Vec<Arc<User>> {
        let mut users: Vec<_> = self.users.read().values().cloned().collect();
        users.sort_by_key(|user| user.user_id());
        users
    }

    /// 온라인 사용자 목록 (ID 순)
    pub fn online_users(&self) -> Vec<Arc<User>> {
        let mut users: Vec<_> = self
            .users
            .read()
            .values()
            .filter(|user| user.is_online())
            .cloned()
            .collect();
        users.sort_by_key(|user| user.user_id());
        users
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }
}
