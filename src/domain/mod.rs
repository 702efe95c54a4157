//! Domain layer: entities, the transition events they emit, and the ports
//! the application layer drives them through.

pub mod event;
pub mod lifecycle;
pub mod notification;
pub mod payment;
pub mod ports;
