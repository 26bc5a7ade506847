//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SluiceConfig (validated, immutable)
//!     → TimeoutConfig handed to each connection at connect time
//! ```
//!
//! # Design Decisions
//! - Defaults live on the config structs; there are no process-wide mutable defaults
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use validation::{validate_config, ValidationError};
pub use schema::{BodyConfig, LoggingConfig, SluiceConfig, TimeoutConfig, TimeoutMode};
