use crate::dto::HealthRes;

/// Simple health service shared by the REST API and the main binary.
///
/// This service provides a standardised way to check the health status of the Saúde backend.
#[derive(Clone)]
pub struct HealthService;

impl HealthService {
    /// Reports the service as healthy.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Saúde is alive".into(),
        }
    }
}
