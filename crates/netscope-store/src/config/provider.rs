//! Settings providers injected into the stores.

use super::StoreSettings;
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of the current settings snapshot
///
/// Stores call this at the start of each operation, so a provider backed by
/// mutable state changes limits live without rebuilding the store.
pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> StoreSettings;
}

/// Fixed settings snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSettings(pub StoreSettings);

impl SettingsProvider for StaticSettings {
    fn settings(&self) -> StoreSettings {
        self.0
    }
}

/// Live-updatable settings shared between a settings component and the stores
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<StoreSettings>>,
}

impl SharedSettings {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the current settings
    pub fn set(&self, settings: StoreSettings) {
        *self.inner.write() = settings;
    }

    /// Modify the current settings in place
    pub fn update(&self, f: impl FnOnce(&mut StoreSettings)) {
        let mut guard = self.inner.write();
        f(&mut *guard);
    }
}

impl SettingsProvider for SharedSettings {
    fn settings(&self) -> StoreSettings {
        *self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_settings() {
        let provider = StaticSettings(StoreSettings {
            max_stored_calls: 3,
            ..StoreSettings::default()
        });
        assert_eq!(provider.settings().max_stored_calls, 3);
    }

    #[test]
    fn test_shared_settings_update_is_visible_to_clones() {
        let settings = SharedSettings::new(StoreSettings::default());
        let view = settings.clone();

        settings.update(|s| s.compression_enabled = false);
        assert!(!view.settings().compression_enabled);

        settings.set(StoreSettings {
            max_stored_calls: 7,
            ..StoreSettings::default()
        });
        assert_eq!(view.settings().max_stored_calls, 7);
        assert!(view.settings().compression_enabled);
    }
}
