//! 간단한 공통 유틸리티

use std::time::{SystemTime, UNIX_EPOCH};

/// 간단한 데이터 유틸리티
pub struct SimpleUtils;

impl SimpleUtils {
    /// 현재 타임스탬프 (초)
    ///
    /// 시스템 시간이 UNIX_EPOCH 이전이면 0을 반환합니다.
    pub fn current_timestamp() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// 바이트를 16진수로 변환
    ///
    /// 프로토콜 위반 로그에 원본 헤더를 남길 때 사용합니다.
    ///
    /// ```
    /// use lobbyserver::tool::SimpleUtils;
    ///
    /// assert_eq!(SimpleUtils::bytes_to_hex(b"Hello"), "48656c6c6f");
    /// ```
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
