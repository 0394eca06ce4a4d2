//! Logging initialization and utilities

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// voxedit::core::logging::init();
/// log::info!("Editor started");
/// ```
pub fn init() {
    builder().init();
}

/// Initialize logging unless a logger is already installed.
///
/// Returns `false` when another logger was set first, which is the normal
/// case when several tests share one process.
pub fn try_init() -> bool {
    builder().try_init().is_ok()
}

fn builder() -> env_logger::Builder {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    )
}
