//! Client side of the resumable upload pipeline: validation, the multipart
//! orchestrator, the per-part transport with retry, the widget-facing state
//! machine, and the processing-readiness poller. Everything network-facing
//! sits behind a trait so the flow can be driven against fakes in tests.

pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod part;
pub mod poller;
pub mod source;
