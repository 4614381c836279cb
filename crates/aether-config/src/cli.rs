//! Command-line arguments for the sky table baker.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Sky table baker command-line arguments.
///
/// CLI values override settings loaded from `bake.ron`.
#[derive(Parser, Debug, Default)]
#[command(
    name = "aether-bake",
    about = "Bake precomputed atmospheric scattering tables"
)]
pub struct CliArgs {
    /// Highest scattering order to compute.
    #[arg(long)]
    pub max_order: Option<u32>,

    /// Worker thread count (0 = one per core).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Run every stage on the main thread.
    #[arg(long)]
    pub serial: bool,

    /// Output directory for the baked tables.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Also write `.hdr` previews of every table.
    #[arg(long)]
    pub debug_hdr: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(order) = args.max_order {
            self.bake.max_scattering_order = order;
        }
        if let Some(threads) = args.threads {
            self.bake.worker_threads = threads;
        }
        if args.serial {
            self.bake.parallel = false;
        }
        if let Some(ref dir) = args.output {
            self.output.directory = dir.clone();
        }
        if args.debug_hdr {
            self.output.write_debug_hdr = true;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            max_order: Some(2),
            threads: Some(3),
            serial: true,
            output: Some(PathBuf::from("/tmp/sky")),
            debug_hdr: true,
            log_level: Some("debug".to_string()),
            config: None,
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.bake.max_scattering_order, 2);
        assert_eq!(config.bake.worker_threads, 3);
        assert!(!config.bake.parallel);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/sky"));
        assert!(config.output.write_debug_hdr);
        assert_eq!(config.debug.log_level, "debug");
    }

    #[test]
    fn test_absent_flags_keep_file_values() {
        let mut config = Config::default();
        config.bake.parallel = false;
        config.output.write_debug_hdr = true;
        config.apply_cli_overrides(&CliArgs::default());
        assert!(!config.bake.parallel);
        assert!(config.output.write_debug_hdr);
        assert_eq!(config.bake.max_scattering_order, 4);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = CliArgs::parse_from([
            "aether-bake",
            "--max-order",
            "6",
            "--serial",
            "-o",
            "out",
        ]);
        assert_eq!(args.max_order, Some(6));
        assert!(args.serial);
        assert!(!args.debug_hdr);
        assert_eq!(args.output, Some(PathBuf::from("out")));
    }
}
