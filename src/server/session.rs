//! Per-connection session state.
//!
//! A [`Session`] is created when a TCP client connects and lives until the
//! connection closes. It carries the authentication binding (which account,
//! if any, this connection acts as) and activity timestamps for the close
//! log. All authorization decisions are made per request against the store,
//! so a role change or ban lands on the very next call, not the next login.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::game::Role;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub peer: String,
    pub username: Option<String>,
    pub access_level: u8,
    pub opened_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    closing: bool,
}

impl Session {
    pub fn new(peer: String) -> Self {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            peer,
            username: None,
            access_level: 0,
            opened_at: now,
            last_activity: now,
            closing: false,
        }
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Bind this connection to an account after a successful login or
    /// registration.
    pub fn login(&mut self, username: String, role: Role) {
        self.access_level = role.access_level();
        self.username = Some(username);
    }

    pub fn logout(&mut self) {
        self.username = None;
        self.access_level = 0;
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    /// Username for log lines, or "guest" before login.
    pub fn display_name(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| "guest".to_string())
    }

    /// Ask the connection driver to close after the current response.
    pub fn request_close(&mut self) {
        self.closing = true;
    }

    pub fn close_requested(&self) -> bool {
        self.closing
    }

    pub fn duration(&self) -> chrono::Duration {
        self.last_activity - self.opened_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_anonymous_and_open() {
        let session = Session::new("127.0.0.1:50000".to_string());
        assert!(!session.is_logged_in());
        assert_eq!(session.display_name(), "guest");
        assert_eq!(session.access_level, 0);
        assert!(!session.close_requested());
    }

    #[test]
    fn login_binds_and_logout_clears() {
        let mut session = Session::new("peer".to_string());
        session.login("maria".to_string(), Role::Moderator);
        assert!(session.is_logged_in());
        assert_eq!(session.display_name(), "maria");
        assert_eq!(session.access_level, Role::Moderator.access_level());

        session.logout();
        assert!(!session.is_logged_in());
        assert_eq!(session.access_level, 0);
    }

    #[test]
    fn close_request_sticks() {
        let mut session = Session::new("peer".to_string());
        session.request_close();
        assert!(session.close_requested());
    }
}
