pub mod csv;
pub mod sse;
