//! Heartbeat monitor: emits an outbound heartbeat when the connection has
//! been quiet for the negotiated interval, and reports when the peer has
//! gone quiet for twice that.
//!
//! There is no background task here. The connection manager's event loop
//! already owns a single `tokio::select!` over transport reads, outbound
//! requests, and this monitor's [`wait_action`](HeartbeatMonitor::wait_action) —
//! adding a second task would just need its own channel back to the loop,
//! for no benefit under the single-task ownership model the rest of the
//! core uses.

use std::time::Duration;

use tokio::time::Instant;

pub(crate) enum HeartbeatAction {
    SendHeartbeat,
    PeerTimedOut,
}

pub(crate) struct HeartbeatMonitor {
    interval: Duration,
    last_sent: Instant,
    last_received: Instant,
    stopped: bool,
}

impl HeartbeatMonitor {
    /// Returns `None` if `interval_secs` is 0: negotiated heartbeat disabled.
    pub fn new(interval_secs: u16) -> Option<Self> {
        if interval_secs == 0 {
            return None;
        }
        let now = Instant::now();
        Some(Self {
            interval: Duration::from_secs(interval_secs as u64),
            last_sent: now,
            last_received: now,
            stopped: false,
        })
    }

    pub fn note_frame_sent(&mut self) {
        self.last_sent = Instant::now();
    }

    pub fn note_frame_received(&mut self) {
        self.last_received = Instant::now();
    }

    /// Halts both timers. After this, [`wait_action`](Self::wait_action)
    /// never resolves again, so a `select!` branch on it simply drops out.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Nothing is flushed asynchronously in this design — sends happen
    /// inline in the event loop — so once `stop` has run there is nothing
    /// left to wait for.
    pub async fn wait_closed(&self) {}

    /// Waits until either a heartbeat is due to be sent or the peer has
    /// missed its deadline. Marks the send time eagerly on
    /// `SendHeartbeat` so the caller doesn't also have to call
    /// `note_frame_sent`.
    pub async fn wait_action(&mut self) -> HeartbeatAction {
        loop {
            if self.stopped {
                return std::future::pending().await;
            }
            let now = Instant::now();
            let send_deadline = self.last_sent + self.interval;
            let timeout_deadline = self.last_received + self.interval * 2;
            if now >= timeout_deadline {
                return HeartbeatAction::PeerTimedOut;
            }
            if now >= send_deadline {
                self.last_sent = now;
                return HeartbeatAction::SendHeartbeat;
            }
            tokio::time::sleep_until(send_deadline.min(timeout_deadline)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_disables_the_monitor() {
        assert!(HeartbeatMonitor::new(0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn emits_a_heartbeat_after_a_quiet_interval() {
        let mut monitor = HeartbeatMonitor::new(1).unwrap();
        match monitor.wait_action().await {
            HeartbeatAction::SendHeartbeat => {}
            HeartbeatAction::PeerTimedOut => panic!("expected a send, not a timeout"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn declares_the_peer_lost_after_twice_the_interval_with_nothing_received() {
        let mut monitor = HeartbeatMonitor::new(1).unwrap();
        monitor.note_frame_sent(); // keep nudging our own send deadline out
        tokio::time::advance(Duration::from_millis(1500)).await;
        monitor.note_frame_sent();
        match monitor.wait_action().await {
            HeartbeatAction::PeerTimedOut => {}
            HeartbeatAction::SendHeartbeat => panic!("expected a peer timeout"),
        }
    }

    #[tokio::test]
    async fn stop_makes_wait_action_never_resolve() {
        let mut monitor = HeartbeatMonitor::new(1).unwrap();
        monitor.stop();
        let result = tokio::time::timeout(Duration::from_millis(50), monitor.wait_action()).await;
        assert!(result.is_err(), "wait_action should hang forever once stopped");
    }
}
