//! Generation provider integration for the DemoForge backend.
//!
//! Provides the [`provider::GenerationProvider`] trait boundary, an HTTP
//! client implementation speaking the task-id/polling proxy API, the
//! [`orchestrator::TaskOrchestrator`] that manages task lifecycles, and
//! the reference-image manager that grounds subjects with canonical stills.

pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod reference;
