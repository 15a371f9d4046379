//! Logging setup for roomchat
//!
//! Builds a `tracing` subscriber from a [`LogConfig`]:
//!
//! - **Console**: pretty or JSONL, always on stderr so it never interleaves
//!   with chat output on stdout
//! - **File**: JSONL with daily/hourly rotation via tracing-appender
//! - **Filtering**: `RUST_LOG` wins over the configured default level
//!
//! # Quick Start
//!
//! ```ignore
//! use roomchat_logging::{ChatSubscriberBuilder, LogConfig};
//!
//! // Quiet console, full JSONL log under ./logs
//! let _guard = ChatSubscriberBuilder::new()
//!     .with_config(LogConfig::interactive().with_file("./logs"))
//!     .init()?;
//! ```
//!
//! Keep the returned guard alive for as long as file output is needed;
//! dropping it flushes and stops the background writer.

pub mod config;
pub mod error;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use error::{LogError, LogResult};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::layers::BoxedLayer;

/// Span names shared by the roomchat crates
pub mod spans {
    pub const NODE_READY: &str = "node_ready";
    pub const ROOM_LEAVE: &str = "room_leave";
    pub const CHAT_SESSION: &str = "chat_session";
    pub const PUBLISH_DRAFT: &str = "publish_draft";
}

/// Builder for configuring and installing the roomchat subscriber
pub struct ChatSubscriberBuilder {
    config: LogConfig,
}

impl ChatSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    ///
    /// Default: JSONL output to the console
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration this builder will install
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// Returns the file writer's guard when file output is configured; it
    /// must be kept alive for the duration of the program.
    pub fn init(self) -> LogResult<Option<WorkerGuard>> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut outputs: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            outputs.push(layers::console_layer(
                &self.config.console,
                &self.config.jsonl,
            ));
        }

        if let Some(file) = &self.config.file {
            let (writer, file_guard) = layers::file_writer(file)?;
            outputs.push(layers::jsonl_layer(writer, &self.config.jsonl));
            guard = Some(file_guard);
        }

        Registry::default()
            .with(outputs)
            .with(env_filter)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for ChatSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> LogResult<()> {
    ChatSubscriberBuilder::new().init().map(|_| ())
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> LogResult<()> {
    ChatSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
        .map(|_| ())
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_testing() {
    let _ = ChatSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}
