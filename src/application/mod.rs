//! Application layer containing the consultation workflow.
//!
//! `ConsultationEngine` (in `engine`) owns the ports; each sibling module adds
//! one group of operations to it: intake, the response handler, the payment
//! gate, the session lifecycle, the status query, and deadline enforcement.
//! Every write goes through the store's compare-and-set on the record version.

pub mod deadline;
pub mod engine;
pub mod intake;
pub mod payment;
pub mod respond;
pub mod session;
pub mod status;
