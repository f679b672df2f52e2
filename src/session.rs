//! Session accessor handed through to compiled code.

use std::time::{SystemTime, UNIX_EPOCH};

/// Per-query session state. Compiled code only reads it through accessors.
#[derive(Debug, Clone)]
pub struct Session {
    session_id: u64,
    user: String,
    time_zone: String,
    locale: String,
    start_time: SystemTime,
}

impl Session {
    /// Creates a new session for a user with UTC time zone and `en_US` locale.
    pub fn new(user: impl Into<String>) -> Self {
        let start_time = SystemTime::now();
        let session_id = start_time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default();

        Session {
            session_id,
            user: user.into(),
            time_zone: "UTC".to_string(),
            locale: "en_US".to_string(),
            start_time,
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_accessors() {
        let session = Session::new("alice")
            .with_time_zone("Asia/Tokyo")
            .with_locale("ja_JP");
        assert_eq!(session.user(), "alice");
        assert_eq!(session.time_zone(), "Asia/Tokyo");
        assert_eq!(session.locale(), "ja_JP");
        assert!(session.start_time() <= SystemTime::now());
    }
}
