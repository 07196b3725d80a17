use std::sync::Once;

static INIT: Once = Once::new();

/// Logger settings for [`init_logging`].
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// `env_logger` filter string such as `"gengine=debug"`. Falls back to
    /// `RUST_LOG`, then `info`.
    pub filter: Option<String>,
    /// Prefix lines with a timestamp.
    pub timestamps: bool,
}

impl LoggingConfig {
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Default::default()
        }
    }
}

/// Install the `env_logger` backend. Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = match &config.filter {
            Some(filter) => {
                let mut b = env_logger::Builder::new();
                b.parse_filters(filter);
                b
            }
            None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")),
        };
        if !config.timestamps {
            builder.format_timestamp(None);
        }
        if builder.try_init().is_err() {
            log::debug!("a logger was already installed; keeping it");
        }
    });
}
