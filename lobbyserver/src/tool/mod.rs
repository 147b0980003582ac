//! 로비 서버 공통 유틸리티 모듈
//!
//! 에러 처리와 간단한 변환 유틸리티를 제공합니다.

pub mod error;
pub mod simple_utils;

pub use error::{ErrorHandler, ErrorSeverity, LobbyError, LobbyResult};
pub use simple_utils::*;
