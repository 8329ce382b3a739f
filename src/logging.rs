//! Logger setup for the training binary.

use log::LevelFilter;

/// Native backend crates whose warnings are suppressed.
const NOISY_MODULES: &[&str] = &[
    "wgpu_core",
    "wgpu_hal",
    "naga",
    "cubecl",
    "cubecl_runtime",
    "cubecl_wgpu",
];

/// Sends logs at `info` and above to stdout.
///
/// Application and backend logs share one stream; backend crates are
/// limited to errors. `RUST_LOG` still overrides everything. Calling this
/// more than once is harmless.
pub fn setup_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    for module in NOISY_MODULES {
        builder.filter_module(module, LevelFilter::Error);
    }
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    let _ = builder.target(env_logger::Target::Stdout).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice() {
        setup_logging();
        setup_logging();
        log::info!("logger installed");
    }
}
