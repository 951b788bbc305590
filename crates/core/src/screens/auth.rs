//! Sign-up and login screen.

use crate::backend::Backend;
use crate::models::Role;
use crate::ports::Session;
use crate::repositories::accounts::SignUp;
use crate::screens::{ScreenEvent, ScreenState};

/// Where the user lands after authenticating.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthOutcome {
    pub session: Session,
    pub role: Role,
}

pub struct AuthViewModel {
    backend: Backend,
    state: ScreenState<AuthOutcome>,
}

impl AuthViewModel {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: ScreenState::Idle,
        }
    }

    pub fn state(&self) -> &ScreenState<AuthOutcome> {
        &self.state
    }

    pub async fn sign_up(&mut self, input: SignUp) {
        self.state.apply(ScreenEvent::Started);
        let result = self
            .backend
            .accounts
            .sign_up(input)
            .await
            .map(|(session, profile)| AuthOutcome {
                session,
                role: profile.role(),
            });
        self.state.apply(ScreenEvent::from_result(result));
    }

    pub async fn login(&mut self, email: &str, password: &str) {
        self.state.apply(ScreenEvent::Started);
        let result = self
            .backend
            .accounts
            .login(email, password)
            .await
            .map(|(session, role)| AuthOutcome { session, role });
        self.state.apply(ScreenEvent::from_result(result));
    }

    pub fn reset(&mut self) {
        self.state.apply(ScreenEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{doctor_sign_up, patient_sign_up};

    #[tokio::test]
    async fn test_sign_up_then_login_reports_role() {
        let mut vm = AuthViewModel::new(Backend::in_memory());

        vm.sign_up(doctor_sign_up("Dr. Silva", "silva@example.com"))
            .await;
        assert_eq!(vm.state().success().map(|o| o.role), Some(Role::Doctor));

        vm.reset();
        assert_eq!(vm.state(), &ScreenState::Idle);

        vm.login("silva@example.com", "secret1").await;
        assert_eq!(vm.state().success().map(|o| o.role), Some(Role::Doctor));
    }

    #[tokio::test]
    async fn test_failed_login_shows_error() {
        let mut vm = AuthViewModel::new(Backend::in_memory());
        vm.sign_up(patient_sign_up("Ana", "ana@example.com")).await;

        vm.login("ana@example.com", "wrong-pass").await;
        assert_eq!(vm.state().error(), Some("invalid email or password"));
    }
}
