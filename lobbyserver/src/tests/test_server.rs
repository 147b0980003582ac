//! 서버 수락 루프 테스트

use std::time::Instant;

use tokio::sync::watch;

use crate::service::tcp_service::{pause_after_accept_error, ACCEPT_RETRY_DELAY};

#[tokio::test]
async fn test_accept_error_pauses_before_retry() {
    let (_shutdown, mut receiver) = watch::channel(false);

    let started = Instant::now();
    assert!(pause_after_accept_error(&mut receiver).await);
    assert!(started.elapsed() >= ACCEPT_RETRY_DELAY);
}

#[tokio::test]
async fn test_accept_pause_ends_on_shutdown() {
    let (shutdown, mut receiver) = watch::channel(false);
    shutdown.send_replace(true);

    let started = Instant::now();
    assert!(!pause_after_accept_error(&mut receiver).await);
    assert!(started.elapsed() < ACCEPT_RETRY_DELAY);
}
