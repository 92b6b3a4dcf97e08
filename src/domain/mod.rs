//! Domain layer: the consultation record, its state machine, and the ports
//! through which the engine reaches storage and external collaborators.

pub mod consultation;
pub mod ports;
