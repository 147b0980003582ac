//! 로비 서버 환경 설정 모듈
//!
//! .env 파일과 환경변수에서 설정을 로드하고 관리합니다.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::protocol::{MAX_ROOM_NAME_LEN, PORT_NUMBER};
use crate::tool::error::{LobbyError, LobbyResult};

/// 서버 시작 시 만들어지는 방
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRoom {
    pub name: String,
    pub capacity: usize,
}

impl DefaultRoom {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

/// 로비 서버 설정 구조체
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyServerConfig {
    /// 바인딩 호스트 주소
    pub host: String,
    /// 바인딩 포트 번호 (0이면 임의 포트)
    pub port: u16,
    /// 방 틱 주기 (밀리초)
    pub tick_interval_ms: u64,
    /// 클라이언트가 만든 방의 정원
    pub room_capacity: usize,
    /// 시작 시 생성할 방 목록
    pub default_rooms: Vec<DefaultRoom>,
    /// 상태 로그 주기 (초, 0이면 비활성화)
    pub stats_interval_secs: u64,
}

impl Default for LobbyServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: PORT_NUMBER,
            tick_interval_ms: 50,
            room_capacity: 4,
            default_rooms: vec![DefaultRoom::new("Lobby", 100), DefaultRoom::new("Room1", 4)],
            stats_interval_secs: 60,
        }
    }
}

impl LobbyServerConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 로드 순서:
    /// 1. 상위 디렉토리의 .env 파일
    /// 2. 현재 디렉토리의 .env 파일
    /// 3. 시스템 환경변수
    /// 4. 기본값
    ///
    /// 값이 있지만 해석할 수 없으면 기본값으로 넘어가지 않고 에러를 반환합니다.
    pub fn from_env() -> Result<Self> {
        Self::load_env_file();

        let defaults = Self::default();
        let default_rooms = match std::env::var("lobby_default_rooms") {
            Ok(raw) => parse_default_rooms(&raw).context("lobby_default_rooms 해석 실패")?,
            Err(_) => defaults.default_rooms,
        };

        let config = Self {
            host: std::env::var("lobby_host").unwrap_or(defaults.host),
            port: env_or("lobby_port", defaults.port)?,
            tick_interval_ms: env_or("lobby_tick_interval_ms", defaults.tick_interval_ms)?,
            room_capacity: env_or("lobby_room_capacity", defaults.room_capacity)?,
            default_rooms,
            stats_interval_secs: env_or("lobby_stats_interval_secs", defaults.stats_interval_secs)?,
        };

        info!("로비 서버 설정 로드 완료: {:?}", config);
        Ok(config)
    }

    /// 바인딩 주소를 반환합니다.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// 상태 로그 주기. 0이면 `None`.
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval_secs > 0).then(|| Duration::from_secs(self.stats_interval_secs))
    }

    /// .env 파일을 로드합니다.
    fn load_env_file() {
        let env_paths = ["../.env", ".env"];

        let mut loaded = false;
        for path in env_paths {
            if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
                info!(".env 파일 로드 성공: {}", path);
                loaded = true;
                break;
            }
        }

        if !loaded {
            warn!(".env 파일을 찾을 수 없습니다. 기본값과 시스템 환경변수를 사용합니다.");
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> LobbyResult<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LobbyError::configuration(key, format!("해석할 수 없는 값: {:?}", raw))),
        Err(_) => Ok(default),
    }
}

/// `name:capacity` 목록을 해석합니다. (예: `Lobby:100,Room1:4`)
///
/// 빈 문자열은 빈 목록입니다.
pub fn parse_default_rooms(raw: &str) -> LobbyResult<Vec<DefaultRoom>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, capacity) = entry.rsplit_once(':').ok_or_else(|| {
                LobbyError::configuration(
                    "lobby_default_rooms",
                    format!("name:capacity 형식이 아닙니다: {:?}", entry),
                )
            })?;
            let capacity = capacity.trim().parse().map_err(|_| {
                LobbyError::configuration(
                    "lobby_default_rooms",
                    format!("정원이 숫자가 아닙니다: {:?}", entry),
                )
            })?;
            Ok(DefaultRoom::new(name.trim(), capacity))
        })
        .collect()
}

/// 설정 검증 유틸리티
pub fn validate_config(config: &LobbyServerConfig) -> Result<()> {
    if config.host.is_empty() {
        anyhow::bail!("호스트 주소가 비어있습니다");
    }

    if config.tick_interval_ms == 0 {
        anyhow::bail!("틱 주기는 0보다 커야 합니다");
    }

    if config.room_capacity == 0 {
        anyhow::bail!("방 정원은 0보다 커야 합니다");
    }

    let mut names = HashSet::new();
    for room in &config.default_rooms {
        if room.name.is_empty() {
            anyhow::bail!("기본 방 이름이 비어있습니다");
        }
        if room.name.len() >= MAX_ROOM_NAME_LEN {
            anyhow::bail!(
                "기본 방 이름이 너무 깁니다: {} ({}바이트 미만이어야 함)",
                room.name,
                MAX_ROOM_NAME_LEN
            );
        }
        if room.capacity == 0 {
            anyhow::bail!("기본 방 '{}'의 정원이 0입니다", room.name);
        }
        if !names.insert(room.name.as_str()) {
            anyhow::bail!("기본 방 이름이 중복됩니다: {}", room.name);
        }
    }

    Ok(())
}
