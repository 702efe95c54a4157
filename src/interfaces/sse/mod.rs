//! Event-stream adapter: turns one broadcaster subscription into
//! `event:`/`data:` frames for a remote observer.

pub mod frame;
pub mod session;

pub use frame::{EventFrame, FrameKind};
pub use session::MonitorSession;
