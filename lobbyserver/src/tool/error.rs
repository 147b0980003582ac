//! 공통 에러 처리 시스템
//!
//! 로비 서버에서 발생하는 모든 에러를 체계적으로 관리합니다.
//! 연결 단위 에러는 해당 연결만 종료시키고, 서버 전체에는 전파되지 않습니다.

use thiserror::Error;
use tracing::{error, info, warn};

/// 로비 서버 에러 타입
#[derive(Debug, Error)]
pub enum LobbyError {
    /// 소켓 I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 상대방이 프레임 경계에서 연결을 닫음
    #[error("상대방이 연결을 종료했습니다")]
    ConnectionClosed,

    /// 헤더에 선언된 크기가 허용 범위를 벗어남
    #[error("잘못된 패킷 크기: {size}바이트 (허용 범위 {min}..={max})")]
    InvalidPacketSize { size: usize, min: usize, max: usize },

    /// 선언된 크기와 조립된 프레임 길이가 다름
    #[error("패킷 크기 불일치: 헤더 {declared}바이트, 실제 {actual}바이트")]
    SizeMismatch { declared: usize, actual: usize },

    /// 전송하려는 프레임이 최대 크기를 초과함
    #[error("전송 프레임이 너무 큽니다: {size}바이트 (최대 {max}바이트)")]
    FrameTooLarge { size: usize, max: usize },

    /// 설정 관련 에러
    #[error("설정 에러 [키: {key}]: {message}")]
    Configuration { key: String, message: String },

    /// 내부 시스템 에러
    #[error("내부 에러 [컴포넌트: {component}]: {message}")]
    Internal { component: String, message: String },
}

impl LobbyError {
    /// 설정 에러 생성
    pub fn configuration(key: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// 내부 에러 생성
    pub fn internal(component: &str, message: impl Into<String>) -> Self {
        Self::Internal {
            component: component.to_string(),
            message: message.into(),
        }
    }

    /// 프레이밍 규칙을 어긴 에러인지 확인합니다.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPacketSize { .. } | Self::SizeMismatch { .. }
        )
    }
}

/// 결과 타입 별칭
pub type LobbyResult<T> = Result<T, LobbyError>;

/// 에러 심각도 레벨
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 정보성 - 정상 동작 중 발생하는 예상 가능한 상황 (상대방 종료 등)
    Info,
    /// 경고 - 해당 연결은 끊기지만 서비스는 계속 가능
    Warning,
    /// 에러 - 기능에 영향을 주지만 복구 가능
    Error,
    /// 치명적 - 서비스 중단이 필요한 심각한 문제
    Critical,
}

/// 에러 컨텍스트 정보
#[derive(Debug)]
pub struct ErrorContext<'a> {
    pub error: &'a LobbyError,
    pub severity: ErrorSeverity,
    pub timestamp: i64,
    pub component: &'a str,
    pub operation: &'a str,
}

/// 에러 핸들러
///
/// 모든 에러를 중앙에서 심각도에 맞는 레벨로 로깅합니다.
pub struct ErrorHandler;

impl ErrorHandler {
    /// 에러를 처리하고 로깅합니다.
    ///
    /// # Arguments
    ///
    /// * `error` - 처리할 에러
    /// * `severity` - 에러 심각도
    /// * `component` - 에러가 발생한 컴포넌트
    /// * `operation` - 에러가 발생한 작업
    pub fn handle_error(
        error: &LobbyError,
        severity: ErrorSeverity,
        component: &str,
        operation: &str,
    ) {
        let context = ErrorContext {
            error,
            severity,
            timestamp: crate::tool::SimpleUtils::current_timestamp(),
            component,
            operation,
        };

        Self::log_error(&context);
    }

    /// 에러를 적절한 로그 레벨로 출력합니다.
    fn log_error(context: &ErrorContext<'_>) {
        let log_message = format!(
            "[{}] [{}] {}",
            context.component, context.operation, context.error
        );

        match context.severity {
            ErrorSeverity::Info => info!(timestamp = context.timestamp, "{}", log_message),
            ErrorSeverity::Warning => warn!(timestamp = context.timestamp, "{}", log_message),
            ErrorSeverity::Error => error!(timestamp = context.timestamp, "{}", log_message),
            ErrorSeverity::Critical => {
                error!(timestamp = context.timestamp, "🚨 CRITICAL: {}", log_message);
                error!("시스템 안정성에 영향을 줄 수 있는 심각한 문제입니다!");
            }
        }
    }
}
