use std::time::Duration;

/// Work the reactor hands to the driver. The reactor never performs I/O itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Connect { generation: u64 },
    CloseTransport,
    StartKeepalive(Duration),
    StopKeepalive,
    SendProbe,
    ScheduleReconnect { generation: u64, delay: Duration },
    CancelReconnect,
    Dispatch(ActionRequest),
}

/// A one-shot backend call, issued while the gate is held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Analyze,
    Haptic(u8),
    Speak(String),
}
