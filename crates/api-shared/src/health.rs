use crate::dto::HealthRes;

/// Health service shared by the API front ends.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Check health without creating an instance.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "IPS suite is alive".into(),
        }
    }
}
