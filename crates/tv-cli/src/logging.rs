//! `env_logger` setup for the `log` facade.

use log::LevelFilter;

const CRATES: &[&str] = &["tv", "tv_core", "tv_store", "tv_refresh"];

/// Level for the Tunevault crates: warnings by default, `-v` adds info,
/// `-vv` debug.
pub(crate) fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Install the logger. Other crates stay at warnings; `RUST_LOG` overrides both.
pub(crate) fn init(verbosity: u8) {
    let level = level_for(verbosity);
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .format_timestamp(None)
        .format_target(false);
    for name in CRATES {
        builder.filter_module(name, level);
    }
    builder.parse_default_env();
    let _ = builder.try_init();
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;
