//! Domain layer: entities, value objects, the status state machine, the
//! commission calculator, and the storage ports.

pub mod audit;
pub mod commission;
pub mod ports;
pub mod schedule;
pub mod status;
pub mod transaction;
