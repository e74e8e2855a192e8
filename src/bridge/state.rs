use std::fmt;

use crate::error::BridgeError;

/// Host-side view of the content surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Nothing loaded
    Idle,
    /// A document is loading; requests are refused until PageReady
    AwaitingPageReady,
    Ready,
    Discovering,
    Injecting,
}

/// What moves the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    NavigationStarted,
    PageReady,
    DiscoveryRequested,
    InjectionRequested,
    /// The terminal message of the in-flight operation arrived
    OperationComplete,
    LoadFailed,
    Closed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl BridgeState {
    /// Next state after `event`, or the reason the event is not allowed now.
    pub fn on(self, event: BridgeEvent) -> Result<BridgeState, BridgeError> {
        use BridgeEvent as E;
        use BridgeState as S;

        match (self, event) {
            // navigation always wins, even mid-operation
            (_, E::NavigationStarted) => Ok(S::AwaitingPageReady),
            (_, E::LoadFailed) | (_, E::Closed) => Ok(S::Idle),

            (S::Idle | S::AwaitingPageReady | S::Ready, E::PageReady) => Ok(S::Ready),
            (S::Discovering | S::Injecting, E::PageReady) => Err(BridgeError::Protocol(format!(
                "PageReady while {} without a navigation",
                self
            ))),

            (S::Ready, E::DiscoveryRequested) => Ok(S::Discovering),
            (S::Ready, E::InjectionRequested) => Ok(S::Injecting),
            (S::Discovering | S::Injecting, E::DiscoveryRequested | E::InjectionRequested) => {
                Err(BridgeError::Busy {
                    state: self.to_string(),
                })
            }
            (S::Idle | S::AwaitingPageReady, E::DiscoveryRequested | E::InjectionRequested) => {
                Err(BridgeError::NotReady {
                    state: self.to_string(),
                })
            }

            (S::Discovering | S::Injecting, E::OperationComplete) => Ok(S::Ready),
            (_, E::OperationComplete) => Err(BridgeError::Protocol(format!(
                "Operation result while {}",
                self
            ))),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, BridgeState::Discovering | BridgeState::Injecting)
    }
}
