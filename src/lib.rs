pub mod core;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bepinex_manager_lib=debug")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
