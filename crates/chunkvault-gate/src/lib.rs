//! Admission control for chunkvault.
//!
//! Each protected operation class (metadata reads, upload streams) has its
//! own [`AdmissionGate`] with a fixed ceiling. Acquisition never waits: a
//! request either gets a [`Permit`] immediately or is refused with
//! [`GateError::Exhausted`]. Upload streams hold their permit for the whole
//! transfer.
//!
//! # Quick Start
//!
//! ```rust
//! use chunkvault_gate::{AdmissionController, GateClass, GateConfig};
//!
//! let gates = AdmissionController::new(&GateConfig::default()).unwrap();
//! let permit = gates.try_acquire(GateClass::Upload).unwrap();
//! assert_eq!(gates.in_use(GateClass::Upload), 1);
//! drop(permit);
//! assert_eq!(gates.in_use(GateClass::Upload), 0);
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod gate;

pub use config::GateConfig;
pub use controller::{AdmissionController, GateClass};
pub use error::{GateError, GateResult};
pub use gate::{AdmissionGate, Permit};
