//! Data-access services.
//!
//! Each service owns handles to the document store and, where it needs authentication, the auth
//! provider. Operations are sequential awaits over those ports and return [`ServiceResult`];
//! no error escapes as a panic.
//!
//! - [`accounts::AccountService`]: sign-up, login, profile lookups
//! - [`linking::LinkingService`]: doctor/patient links via sharing codes
//! - [`vitals::VitalsService`]: vital record CRUD and the doctor's aggregate view
//! - [`recommendations::RecommendationService`]: doctor to patient notes
//! - [`access`]: authorisation checks shared by the outer surfaces
//!
//! [`ServiceResult`]: crate::ServiceResult

pub mod access;
pub mod accounts;
pub mod linking;
pub mod profiles;
pub mod recommendations;
pub mod vitals;

#[cfg(test)]
pub(crate) mod test_support;
