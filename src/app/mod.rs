//! Dependency checking.
//!
//! Before any Firebase service is used, the platform is asked whether everything
//! it needs is present. A native SDK answers this itself; over HTTP the answer
//! comes from the [`FirebaseOptions`] the app was configured with.

use crate::core::config::FirebaseOptions;
use std::fmt;
use tracing::debug;

/// Outcome of a dependency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyStatus {
    Available,
    UnavailableDisabled,
    UnavailableInvalid,
    UnavailableMissing,
    UnavailablePermission,
    UnavailableUpdating,
    UnavailableOther,
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DependencyStatus::Available => "Available",
            DependencyStatus::UnavailableDisabled => "UnavailableDisabled",
            DependencyStatus::UnavailableInvalid => "UnavailableInvalid",
            DependencyStatus::UnavailableMissing => "UnavailableMissing",
            DependencyStatus::UnavailablePermission => "UnavailablePermission",
            DependencyStatus::UnavailableUpdating => "UnavailableUpdating",
            DependencyStatus::UnavailableOther => "UnavailableOther",
        };
        f.write_str(name)
    }
}

/// Resolves whether Firebase can be used on this platform.
#[async_trait::async_trait]
pub trait DependencyChecker: Send + Sync {
    async fn check_dependencies(&self) -> anyhow::Result<DependencyStatus>;
}

/// Checks that the options carry what the HTTP adapters need.
pub struct OptionsDependencyChecker {
    options: FirebaseOptions,
}

impl OptionsDependencyChecker {
    pub fn new(options: FirebaseOptions) -> Self {
        Self { options }
    }
}

/// Google App IDs look like `1:<project number>:<platform>:<hex>`.
fn is_valid_app_id(app_id: &str) -> bool {
    let parts: Vec<&str> = app_id.split(':').collect();
    match parts.as_slice() {
        [version, number, platform, hash] => {
            !version.is_empty()
                && version.chars().all(|c| c.is_ascii_digit())
                && !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit())
                && !platform.is_empty()
                && !hash.is_empty()
                && hash.chars().all(|c| c.is_ascii_hexdigit())
        }
        _ => false,
    }
}

#[async_trait::async_trait]
impl DependencyChecker for OptionsDependencyChecker {
    async fn check_dependencies(&self) -> anyhow::Result<DependencyStatus> {
        let required = [
            ("project_id", &self.options.project_id),
            ("app_id", &self.options.app_id),
            ("api_key", &self.options.api_key),
        ];
        for (name, field) in required {
            if FirebaseOptions::require(field, name).is_err() {
                debug!(field = name, "Firebase option missing");
                return Ok(DependencyStatus::UnavailableMissing);
            }
        }

        let app_id = self.options.app_id.as_deref().unwrap_or_default();
        if !is_valid_app_id(app_id) {
            debug!(app_id, "Firebase app id is malformed");
            return Ok(DependencyStatus::UnavailableInvalid);
        }

        Ok(DependencyStatus::Available)
    }
}
