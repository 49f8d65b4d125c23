//! Device and process metadata attached to report bundles.

use std::collections::BTreeMap;

/// Source of key-value device information.
pub trait DeviceInfoProvider: Send + Sync {
    /// Collect the current values.
    fn collect(&self) -> BTreeMap<String, String>;
}

/// Process-level device information available on every platform.
#[derive(Debug, Clone, Default)]
pub struct ProcessDeviceInfo {
    app_name: Option<String>,
    app_version: Option<String>,
}

impl ProcessDeviceInfo {
    /// Create a provider. The application name defaults to the executable
    /// name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this application name.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Report this application version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }
}

impl DeviceInfoProvider for ProcessDeviceInfo {
    fn collect(&self) -> BTreeMap<String, String> {
        let mut info = BTreeMap::new();
        info.insert("os".to_string(), std::env::consts::OS.to_string());
        info.insert("arch".to_string(), std::env::consts::ARCH.to_string());
        info.insert("family".to_string(), std::env::consts::FAMILY.to_string());
        if let Ok(count) = std::thread::available_parallelism() {
            info.insert("processorCount".to_string(), count.to_string());
        }

        let app_name = self.app_name.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        });
        if let Some(name) = app_name {
            info.insert("appName".to_string(), name);
        }
        if let Some(version) = &self.app_version {
            info.insert("appVersion".to_string(), version.clone());
        }
        info.insert(
            "witnessVersion".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_device_info() {
        let info = ProcessDeviceInfo::new()
            .with_app_name("demo")
            .with_app_version("1.2.3")
            .collect();

        assert_eq!(info["os"], std::env::consts::OS);
        assert_eq!(info["appName"], "demo");
        assert_eq!(info["appVersion"], "1.2.3");
        assert!(info.contains_key("processorCount"));
    }

    #[test]
    fn test_app_name_defaults_to_executable() {
        let info = ProcessDeviceInfo::new().collect();
        assert!(info.contains_key("appName"));
        assert!(!info.contains_key("appVersion"));
    }
}
