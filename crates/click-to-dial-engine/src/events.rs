//! Messages exchanged with the host application.

/// Answer to [`OutboundEvent::ObserverReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyResponse {
    /// Whether this page should be annotated at all.
    pub observe: bool,
}

/// Signals the host sends to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Response to the ready handshake.
    Ready(ReadyResponse),
    /// The frame's viewport changed size.
    Resize,
    /// Tear everything down.
    Stop,
    /// The call UI is gone again; icons may be clicked.
    EnableIcons,
}

/// Request to dial a number, emitted once per valid click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    pub number: String,
}

/// Messages the engine sends to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// The engine is loaded and waits for a [`Signal::Ready`].
    ObserverReady,
    Dial(DialRequest),
}
