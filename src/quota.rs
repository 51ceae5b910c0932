use crate::client::AuthMode;
use crate::error::{Error, Result};

use std::collections::HashMap;
use std::time::Duration;

/// The fixed interval over which every quota's allowed-request count is defined.
pub const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Category of remote request, each governed by its own per-window quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// Follower/friend id listings.
    Associates,
    /// Direct message listings.
    DirectMessages,
    /// Per-account post timelines.
    Timeline,
    /// Bulk resolution of records by id.
    Lookup,
    /// Anything not covered by a more specific class.
    Default,
}

/// All the classes a registry is expected to cover.
pub(crate) const ALL_CLASSES: [OperationClass; 5] = [
    OperationClass::Associates,
    OperationClass::DirectMessages,
    OperationClass::Timeline,
    OperationClass::Lookup,
    OperationClass::Default,
];

/// Allowed-requests-per-window table, keyed by operation class and auth mode.
///
/// A limit of `0` means the class is not request-paced at all. The table is plain data so
/// that it can eventually be populated from the platform's live rate-limit-status endpoint
/// instead of the built-in constants, without touching any call site.
#[derive(Debug, Clone)]
pub struct QuotaRegistry {
    limits: HashMap<(OperationClass, AuthMode), u32>,
}

impl Default for QuotaRegistry {
    /// The platform's documented per-window limits for both auth modes.
    fn default() -> Self {
        use AuthMode::*;
        use OperationClass::*;

        Self::new(vec![
            ((Associates, User), 15),
            ((Associates, App), 15),
            ((DirectMessages, User), 15),
            ((DirectMessages, App), 15),
            ((Timeline, User), 900),
            ((Timeline, App), 1500),
            ((Lookup, User), 900),
            ((Lookup, App), 300),
            ((Default, User), 15),
            ((Default, App), 15),
        ])
    }
}

impl QuotaRegistry {
    /// Build a registry from explicit rows. Rows absent from the table make any request of
    /// that class fail with [`Error::Configuration`].
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = ((OperationClass, AuthMode), u32)>,
    {
        QuotaRegistry {
            limits: rows.into_iter().collect(),
        }
    }

    /// How many requests of this class the given auth mode may issue per window.
    pub fn allowed_per_window(&self, class: OperationClass, mode: AuthMode) -> Result<u32> {
        self.limits
            .get(&(class, mode))
            .copied()
            .ok_or(Error::Configuration { class, mode })
    }

    /// A registry where nothing is paced at all. Endpoint tests use this so that walking
    /// multiple pages doesn't sleep.
    #[cfg(test)]
    pub(crate) fn unlimited() -> Self {
        Self::new(ALL_CLASSES.iter().flat_map(|&class| {
            vec![((class, AuthMode::User), 0), ((class, AuthMode::App), 0)]
        }))
    }

    /// The minimum spacing between two requests of this class that keeps the quota intact,
    /// i.e. `WINDOW / limit`. Zero for unlimited classes.
    pub fn spacing(&self, class: OperationClass, mode: AuthMode) -> Result<Duration> {
        let limit = self.allowed_per_window(class, mode)?;

        if limit == 0 {
            Ok(Duration::ZERO)
        } else {
            Ok(WINDOW / limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_every_combination() {
        let registry = QuotaRegistry::default();

        for &class in ALL_CLASSES.iter() {
            for &mode in [AuthMode::User, AuthMode::App].iter() {
                assert!(registry.allowed_per_window(class, mode).is_ok());
            }
        }
    }

    #[test]
    fn spacing_divides_the_window() {
        let registry = QuotaRegistry::default();

        assert_eq!(
            registry
                .spacing(OperationClass::Associates, AuthMode::User)
                .unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(
            registry
                .spacing(OperationClass::Timeline, AuthMode::User)
                .unwrap(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn spacing_is_zero_for_unlimited_classes() {
        let registry = QuotaRegistry::new(vec![((OperationClass::Default, AuthMode::App), 0)]);

        assert_eq!(
            registry
                .spacing(OperationClass::Default, AuthMode::App)
                .unwrap(),
            Duration::ZERO
        );
    }

    #[test]
    fn missing_row_is_a_configuration_error() {
        let registry = QuotaRegistry::new(vec![]);

        assert_eq!(
            registry.allowed_per_window(OperationClass::Lookup, AuthMode::User),
            Err(Error::Configuration {
                class: OperationClass::Lookup,
                mode: AuthMode::User,
            })
        );
    }
}
