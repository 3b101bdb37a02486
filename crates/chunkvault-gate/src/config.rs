use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult};

/// Ceilings for the two admission gates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Maximum concurrent list requests.
    pub max_read_requests: usize,
    /// Maximum concurrent upload streams.
    pub max_upload_requests: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_read_requests: 16,
            max_upload_requests: 8,
        }
    }
}

impl GateConfig {
    /// Reject ceilings that would refuse every request.
    pub fn validate(&self) -> GateResult<()> {
        if self.max_read_requests == 0 {
            return Err(GateError::Config("max_read_requests must be at least 1".into()));
        }
        if self.max_upload_requests == 0 {
            return Err(GateError::Config("max_upload_requests must be at least 1".into()));
        }
        Ok(())
    }
}
