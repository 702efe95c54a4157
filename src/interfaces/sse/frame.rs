use crate::domain::event::PaymentEvent;
use crate::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Snapshot of the status at subscribe time.
    Initial,
    StatusChange,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Initial => "initial",
            FrameKind::StatusChange => "status_change",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    pub kind: FrameKind,
    pub event: Arc<PaymentEvent>,
}

impl EventFrame {
    pub fn initial(event: Arc<PaymentEvent>) -> Self {
        Self {
            kind: FrameKind::Initial,
            event,
        }
    }

    pub fn status_change(event: Arc<PaymentEvent>) -> Self {
        Self {
            kind: FrameKind::StatusChange,
            event,
        }
    }

    /// Event-type line, JSON payload line, blank line.
    pub fn encode(&self) -> Result<String> {
        let data = serde_json::to_string(self.event.as_ref())?;
        Ok(format!("event: {}\ndata: {}\n\n", self.kind.as_str(), data))
    }
}
