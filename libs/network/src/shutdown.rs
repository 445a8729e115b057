//! Stop signalling for long-running connection tasks
//!
//! Both the collector's handlers and the simulator's devices watch a single
//! `watch::Receiver<bool>`. `true` means stop; a dropped sender never does.

use tokio::sync::watch;

/// Whether a stop has already been requested
pub fn stop_flag(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Resolves once `shutdown` holds `true`; pends forever if the sender is gone
pub async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let observed = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !observed {
        std::future::pending::<()>().await;
    }
}
