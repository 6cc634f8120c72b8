/// Side effects requested by reconciliation; executed by the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StopChannels { reason: TerminalReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    Completed,
    Failed,
    TimedOut,
}
