use super::{ConfigError, PierConfig};

/// Trait for strongly-typed configuration sections.
///
/// ```ignore
/// impl ConfigProperties for DatabaseSection {
///     fn prefix() -> &'static str { "pier.database" }
///     fn from_config(config: &PierConfig) -> Result<Self, ConfigError> {
///         Ok(Self { name: config.get(&Self::key("name"))? })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"pier.database"`).
    fn prefix() -> &'static str;

    /// Construct from a `PierConfig` instance.
    fn from_config(config: &PierConfig) -> Result<Self, ConfigError>;

    /// Absolute key for a property of this section.
    fn key(property: &str) -> String {
        format!("{}.{property}", Self::prefix())
    }
}
