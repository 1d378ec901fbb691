use std::sync::Once;

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::settings::LogFormat;

static INIT: Once = Once::new();

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing once for the process.
///
/// The `log_format` parameter controls whether logs are output as
/// human-readable text (default) or structured JSON. The `RUST_LOG`
/// environment variable controls filtering, defaulting to `info`.
pub fn init(log_format: LogFormat) -> anyhow::Result<()> {
    let mut init_result: Option<anyhow::Result<()>> = None;
    INIT.call_once(|| {
        let result = {
            let env_filter = build_env_filter();
            match log_format {
                LogFormat::Text => {
                    let fmt_layer = tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .compact()
                        .with_filter(env_filter);
                    init_with_fmt_layer(fmt_layer)
                }
                LogFormat::Json => {
                    let fmt_layer = tracing_subscriber::fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .json()
                        .with_filter(env_filter);
                    init_with_fmt_layer(fmt_layer)
                }
            }
        };
        init_result = Some(result);
    });
    match init_result {
        Some(res) => res,
        // A second call is a no-op; the first installation stands.
        None => Ok(()),
    }
}

fn init_with_fmt_layer<L>(fmt_layer: L) -> anyhow::Result<()>
where
    L: tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(fmt_layer).try_init()?;
    Ok(())
}
