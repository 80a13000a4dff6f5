//! Logger initialisation.
//!
//! Everything in the crate logs through the `log` facade. Hosts that already
//! install a logger can skip this; calling [`init`] a second time is harmless.

/// Install the platform logger: `env_logger` natively (honouring `RUST_LOG`,
/// defaulting to `warn`) and `console_log` in the browser.
pub fn init() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .try_init();
    }
    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Warn).is_err() {
            log::debug!("console logger was already installed");
        }
    }
}
