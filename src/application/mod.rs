//! Application layer: the event broadcaster, the background lifecycle
//! executor and the `PaymentService` that ties creation to both.

pub mod broadcaster;
pub mod lifecycle;
pub mod service;
