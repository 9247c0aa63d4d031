//! # pier-core
//!
//! Ambient runtime shared by the Pier data crates: layered configuration
//! ([`PierConfig`]), typed config sections ([`ConfigProperties`]) and the
//! tracing subscriber bootstrap ([`init_tracing`]).

pub mod config;
pub mod logging;

pub use config::{
    ByteSize, ConfigError, ConfigProperties, ConfigValue, DefaultSecretResolver, FromConfigValue,
    PierConfig, SecretResolver,
};
pub use logging::{init_tracing, try_init_tracing};

pub mod prelude {
    //! Re-exports of the most commonly used core types.
    pub use crate::{ConfigProperties, PierConfig};
}
