use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use crate::gate::{AdmissionGate, Permit};

/// Class of protected operation. Each class has its own gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateClass {
    /// Metadata listing.
    Read,
    /// Streaming upload.
    Upload,
}

impl fmt::Display for GateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// The pair of independent gates guarding the service.
#[derive(Clone, Debug)]
pub struct AdmissionController {
    read: Arc<AdmissionGate>,
    upload: Arc<AdmissionGate>,
}

impl AdmissionController {
    /// Build both gates from a validated configuration.
    pub fn new(config: &GateConfig) -> GateResult<Self> {
        config.validate()?;
        Ok(Self {
            read: Arc::new(AdmissionGate::new(config.max_read_requests)),
            upload: Arc::new(AdmissionGate::new(config.max_upload_requests)),
        })
    }

    /// The gate for `class`.
    pub fn gate(&self, class: GateClass) -> &Arc<AdmissionGate> {
        match class {
            GateClass::Read => &self.read,
            GateClass::Upload => &self.upload,
        }
    }

    /// Admit one request of `class` or fail immediately.
    pub fn try_acquire(&self, class: GateClass) -> GateResult<Permit> {
        let gate = self.gate(class);
        gate.try_permit().ok_or(GateError::Exhausted {
            class,
            limit: gate.limit(),
        })
    }

    /// Permits currently held for `class`.
    pub fn in_use(&self, class: GateClass) -> usize {
        self.gate(class).in_use()
    }
}
