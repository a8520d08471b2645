use tracing::debug;

use crate::providers::Provider;

/// Lifecycle of one upstream provider connection.
///
/// Connecting → Open on a successful connect, → Failed on a failed one.
/// Open → Closing on terminate or a peer close request. Closing → Closed on
/// the confirmed upstream close. Failed and Closed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsessionState {
    Connecting,
    Open,
    Closing,
    Closed,
    Failed,
}

/// One provider-specific upstream connection owned by a session.
#[derive(Debug)]
pub struct Subsession {
    provider: Provider,
    state: SubsessionState,
}

impl Subsession {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            state: SubsessionState::Connecting,
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn state(&self) -> SubsessionState {
        self.state
    }

    /// Connecting → Open. Returns whether the transition applied.
    pub fn mark_open(&mut self) -> bool {
        self.transition(SubsessionState::Connecting, SubsessionState::Open)
    }

    /// Connecting → Failed (terminal).
    pub fn mark_failed(&mut self) -> bool {
        self.transition(SubsessionState::Connecting, SubsessionState::Failed)
    }

    /// Open → Closing. A repeated close request is a no-op, never a fault.
    pub fn begin_close(&mut self) -> bool {
        self.transition(SubsessionState::Open, SubsessionState::Closing)
    }

    /// Closing → Closed (terminal).
    pub fn mark_closed(&mut self) -> bool {
        self.transition(SubsessionState::Closing, SubsessionState::Closed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SubsessionState::Closed | SubsessionState::Failed
        )
    }

    fn transition(&mut self, from: SubsessionState, to: SubsessionState) -> bool {
        if self.state == from {
            debug!(provider = %self.provider, ?from, ?to, "subsession transition");
            self.state = to;
            true
        } else {
            debug!(
                provider = %self.provider,
                current = ?self.state,
                requested = ?to,
                "subsession transition skipped"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_lifecycle() {
        let mut sub = Subsession::new(Provider::Deepgram);
        assert_eq!(sub.state(), SubsessionState::Connecting);

        assert!(sub.mark_open());
        assert_eq!(sub.state(), SubsessionState::Open);

        assert!(sub.begin_close());
        assert_eq!(sub.state(), SubsessionState::Closing);

        assert!(sub.mark_closed());
        assert_eq!(sub.state(), SubsessionState::Closed);
        assert!(sub.is_terminal());
    }

    #[test]
    fn connect_failure_is_terminal() {
        let mut sub = Subsession::new(Provider::AssemblyAi);

        assert!(sub.mark_failed());
        assert!(sub.is_terminal());

        // No further transitions out of Failed.
        assert!(!sub.mark_open());
        assert!(!sub.begin_close());
        assert!(!sub.mark_closed());
        assert_eq!(sub.state(), SubsessionState::Failed);
    }

    #[test]
    fn double_close_request_is_noop() {
        let mut sub = Subsession::new(Provider::Deepgram);
        sub.mark_open();

        assert!(sub.begin_close());
        // Second terminate: no-op, no fault.
        assert!(!sub.begin_close());
        assert_eq!(sub.state(), SubsessionState::Closing);
    }

    #[test]
    fn closed_accepts_no_transitions() {
        let mut sub = Subsession::new(Provider::Deepgram);
        sub.mark_open();
        sub.begin_close();
        sub.mark_closed();

        assert!(!sub.mark_open());
        assert!(!sub.begin_close());
        assert!(!sub.mark_closed());
        assert_eq!(sub.state(), SubsessionState::Closed);
    }

    #[test]
    fn close_before_open_is_noop() {
        let mut sub = Subsession::new(Provider::AssemblyAi);
        assert!(!sub.begin_close());
        assert_eq!(sub.state(), SubsessionState::Connecting);
    }
}
