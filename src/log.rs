use crate::input::JobConfig;
use env_logger::{Builder, Env};
use std::time::Duration;

/// Initializes `env_logger` for the binary.
///
/// `-v` selects `debug`, `-q` selects `error`, otherwise `info`. `RUST_LOG`
/// takes precedence over both.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format_timestamp_secs();
    // Tests may initialize more than once
    let _ = builder.try_init();
}

pub fn show_greeting(source: &str) {
    println!("=== Raster Tools ===");
    println!("Loading rasters from: {}", source);
}

pub fn config_echo(config: &JobConfig) {
    println!("\nConfiguration:");
    println!("  Input directory: {}", config.input_dir.display());
    println!("  Pattern: {}", config.pattern);
    println!("  Year extraction: {}", config.year.kind());
    if let crate::year::YearConfig::Regex { pattern } = &config.year {
        println!("    Regex: {}", pattern);
    }
    println!("  On error: {:?}", config.on_error);
    println!("  Sorted: {}", config.sort_paths);
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!(
        "\n=== Load completed successfully in {:.2}s! ===",
        elapsed.as_secs_f64()
    );
}
