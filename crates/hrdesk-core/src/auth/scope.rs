use super::session::SessionManager;
use crate::error::UsageError;

/// Explicit holder through which screens reach the session manager.
///
/// One scope per running application, built at start-up and passed down;
/// there is no global instance.
#[derive(Debug, Default)]
pub struct SessionScope {
    manager: Option<SessionManager>,
}

impl SessionScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provided(manager: SessionManager) -> Self {
        Self {
            manager: Some(manager),
        }
    }

    /// Install `manager`, returning any previously provided one.
    pub fn provide(&mut self, manager: SessionManager) -> Option<SessionManager> {
        self.manager.replace(manager)
    }

    pub fn is_provided(&self) -> bool {
        self.manager.is_some()
    }

    pub fn try_session(&self) -> Result<&SessionManager, UsageError> {
        self.manager.as_ref().ok_or(UsageError::OutsideScope)
    }

    pub fn try_session_mut(&mut self) -> Result<&mut SessionManager, UsageError> {
        self.manager.as_mut().ok_or(UsageError::OutsideScope)
    }

    /// The provided manager.
    ///
    /// # Panics
    ///
    /// Panics if no manager was provided. Reaching the session outside its
    /// scope is a programming error.
    pub fn session(&mut self) -> &mut SessionManager {
        match self.try_session_mut() {
            Ok(manager) => manager,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn take(&mut self) -> Option<SessionManager> {
        self.manager.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EncryptedStore, MemoryStorage};

    fn manager() -> SessionManager {
        SessionManager::open(EncryptedStore::new(MemoryStorage::new(), Some("scope-secret")))
    }

    #[test]
    fn test_empty_scope_reports_usage_error() {
        let mut scope = SessionScope::new();
        assert!(!scope.is_provided());
        assert_eq!(scope.try_session().unwrap_err(), UsageError::OutsideScope);
        assert_eq!(scope.try_session_mut().unwrap_err(), UsageError::OutsideScope);
    }

    #[test]
    #[should_panic(expected = "outside of a provided SessionScope")]
    fn test_session_outside_scope_panics() {
        let mut scope = SessionScope::new();
        scope.session();
    }

    #[test]
    fn test_provided_scope_reaches_manager() {
        let mut scope = SessionScope::provided(manager());
        assert!(!scope.session().is_authenticated());
        assert!(!scope.try_session().unwrap().is_loading());

        assert!(scope.provide(manager()).is_some());
        assert!(scope.take().is_some());
        assert!(!scope.is_provided());
    }
}
