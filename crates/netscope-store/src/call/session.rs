//! Session tracking per (device, package) pair.

use std::collections::HashMap;

/// Identity of a monitored application on a device
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SessionKey {
    pub device_id: String,
    pub package_name: String,
}

impl SessionKey {
    pub fn new(device_id: &str, package_name: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            package_name: package_name.to_string(),
        }
    }
}

/// Outcome of observing an app instance for a session key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// First instance ever seen for this key
    Started,
    /// Same instance as last time
    Unchanged,
    /// The app restarted; records of the previous instance are stale
    Replaced { previous: String },
}

/// Last seen app instance per (device, package)
#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: HashMap<SessionKey, String>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `app_instance` as the live session for `key`.
    pub fn observe(&mut self, key: SessionKey, app_instance: &str) -> SessionChange {
        match self.sessions.get_mut(&key) {
            Some(current) if current == app_instance => SessionChange::Unchanged,
            Some(current) => {
                let previous = std::mem::replace(current, app_instance.to_string());
                SessionChange::Replaced { previous }
            }
            None => {
                self.sessions.insert(key, app_instance.to_string());
                SessionChange::Started
            }
        }
    }

    pub fn current(&self, key: &SessionKey) -> Option<&str> {
        self.sessions.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_instance_starts_session() {
        let mut tracker = SessionTracker::new();
        let key = SessionKey::new("d1", "p1");

        assert_eq!(tracker.current(&key), None);
        assert_eq!(tracker.observe(key.clone(), "s1"), SessionChange::Started);
        assert_eq!(tracker.current(&key), Some("s1"));
    }

    #[test]
    fn test_same_instance_is_unchanged() {
        let mut tracker = SessionTracker::new();
        let key = SessionKey::new("d1", "p1");

        tracker.observe(key.clone(), "s1");
        assert_eq!(tracker.observe(key.clone(), "s1"), SessionChange::Unchanged);
        assert_eq!(tracker.current(&key), Some("s1"));
    }

    #[test]
    fn test_new_instance_replaces_previous() {
        let mut tracker = SessionTracker::new();
        let key = SessionKey::new("d1", "p1");

        tracker.observe(key.clone(), "s1");
        assert_eq!(
            tracker.observe(key.clone(), "s2"),
            SessionChange::Replaced {
                previous: "s1".to_string()
            }
        );
        assert_eq!(tracker.current(&key), Some("s2"));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut tracker = SessionTracker::new();

        tracker.observe(SessionKey::new("d1", "p1"), "s1");
        assert_eq!(
            tracker.observe(SessionKey::new("d1", "p2"), "s9"),
            SessionChange::Started
        );
        assert_eq!(
            tracker.observe(SessionKey::new("d2", "p1"), "s9"),
            SessionChange::Started
        );
        assert_eq!(tracker.current(&SessionKey::new("d1", "p1")), Some("s1"));
        assert_eq!(tracker.current(&SessionKey::new("d2", "p1")), Some("s9"));
    }
}
