//! Logging setup

use crate::{LoggingSettings, MonitorError};
use tracing_subscriber::FmtSubscriber;

/// Initialize the global tracing subscriber
pub fn init_logging(settings: &LoggingSettings) -> Result<(), MonitorError> {
    let builder = FmtSubscriber::builder()
        .with_max_level(settings.max_level()?)
        .with_target(true);

    let result = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| MonitorError::Logging(e.to_string()))
}
