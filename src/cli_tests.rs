//! # CLI Integration Tests
//!
//! Argument parsing for every subcommand, global flags and error cases.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;

    use crate::cli::{
        Cli, Commands, ConfigFormat, ENV_TEST_MUTEX, LoadOverrides, OutputFormat, TemplateType,
        merge_job_config,
    };
    use crate::loader::FailurePolicy;
    use crate::year::YearConfig;

    /// Test basic CLI argument parsing
    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["raster-tools", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(error.to_string().contains("Load every matching raster of a directory"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["raster-tools", "--version"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "raster-tools",
            "--verbose",
            "--output-format",
            "json",
            "--config",
            "/path/to/job.json",
            "template",
            "basic",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/job.json")));
    }

    #[test]
    fn test_load_command_basic() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let cli = Cli::parse_from(["raster-tools", "load", "data/dems"]);

        if let Commands::Load {
            dir,
            pattern,
            year_regex,
            no_year,
            on_error,
            sort,
            no_progress,
            format,
        } = &cli.command
        {
            assert_eq!(dir, &Some(PathBuf::from("data/dems")));
            assert_eq!(pattern, &None);
            assert_eq!(year_regex, &None);
            assert!(!no_year);
            assert_eq!(on_error, &None);
            assert!(!sort);
            assert!(!no_progress);
            assert_eq!(format, &None);
        } else {
            panic!("Expected Load command");
        }
    }

    #[test]
    fn test_load_command_with_options() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let cli = Cli::parse_from([
            "raster-tools",
            "load",
            "data/dems",
            "-p",
            "dem_*.tif",
            "--year-regex",
            r"_(\d{4})\.tif$",
            "--on-error",
            "abort",
            "--sort",
            "--no-progress",
            "--format",
            "csv",
        ]);

        if let Commands::Load {
            pattern,
            year_regex,
            on_error,
            sort,
            no_progress,
            format,
            ..
        } = &cli.command
        {
            assert_eq!(pattern.as_deref(), Some("dem_*.tif"));
            assert_eq!(year_regex.as_deref(), Some(r"_(\d{4})\.tif$"));
            assert_eq!(on_error, &Some(FailurePolicy::Abort));
            assert!(sort);
            assert!(no_progress);
            assert_eq!(format, &Some(OutputFormat::Csv));
        } else {
            panic!("Expected Load command");
        }
    }

    #[test]
    fn test_load_rejects_invalid_year_regex() {
        let result = Cli::try_parse_from(["raster-tools", "load", "dems", "--year-regex", "(unclosed"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_year_with_year_regex_parses() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let cli = Cli::parse_from([
            "raster-tools",
            "load",
            "dems",
            "--year-regex",
            r"(\d{4})",
            "--no-year",
        ]);

        if let Commands::Load {
            dir,
            pattern,
            year_regex,
            no_year,
            on_error,
            sort,
            ..
        } = cli.command
        {
            let overrides = LoadOverrides {
                dir,
                pattern,
                year_regex,
                no_year,
                on_error,
                sort,
            };
            let config = merge_job_config(None, overrides).unwrap();
            assert_eq!(config.year, YearConfig::None);
        } else {
            panic!("Expected Load command");
        }
    }

    #[test]
    fn test_invalid_failure_policy() {
        let result = Cli::try_parse_from(["raster-tools", "load", "dems", "--on-error", "ignore"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_info_command() {
        let cli = Cli::parse_from(["raster-tools", "info", "dem.tif", "--format", "yaml"]);

        if let Commands::Info { file, format } = &cli.command {
            assert_eq!(file, &PathBuf::from("dem.tif"));
            assert_eq!(format, &Some(OutputFormat::Yaml));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_info_requires_file() {
        assert!(Cli::try_parse_from(["raster-tools", "info"]).is_err());
    }

    #[test]
    fn test_bump_command_defaults() {
        let cli = Cli::parse_from(["raster-tools", "bump", "dem.tif"]);

        if let Commands::Bump {
            input,
            output,
            threshold,
            replacement,
            force,
        } = &cli.command
        {
            assert_eq!(input, &PathBuf::from("dem.tif"));
            assert_eq!(output, &None);
            assert_eq!(*threshold, 0.0);
            assert_eq!(*replacement, 0.0);
            assert!(!force);
        } else {
            panic!("Expected Bump command");
        }
    }

    #[test]
    fn test_bump_command_negative_values() {
        let cli = Cli::parse_from([
            "raster-tools",
            "bump",
            "dem.tif",
            "clean.tif",
            "--threshold",
            "-10",
            "--replacement",
            "-10",
            "--force",
        ]);

        if let Commands::Bump {
            output,
            threshold,
            replacement,
            force,
            ..
        } = &cli.command
        {
            assert_eq!(output, &Some(PathBuf::from("clean.tif")));
            assert_eq!(*threshold, -10.0);
            assert_eq!(*replacement, -10.0);
            assert!(force);
        } else {
            panic!("Expected Bump command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["raster-tools", "validate", "job.yaml", "--detailed"]);

        if let Commands::Validate {
            config_file,
            detailed,
        } = &cli.command
        {
            assert_eq!(config_file, &Some(PathBuf::from("job.yaml")));
            assert!(detailed);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_template_command() {
        let cli = Cli::parse_from([
            "raster-tools",
            "template",
            "yearly",
            "--format",
            "yaml",
            "-o",
            "job.yaml",
        ]);

        if let Commands::Template {
            template_type,
            output,
            format,
        } = &cli.command
        {
            assert_eq!(template_type, &TemplateType::Yearly);
            assert_eq!(output, &Some(PathBuf::from("job.yaml")));
            assert_eq!(format, &ConfigFormat::Yaml);
        } else {
            panic!("Expected Template command");
        }
    }

    #[test]
    fn test_template_defaults_to_json() {
        let cli = Cli::parse_from(["raster-tools", "template", "basic"]);
        if let Commands::Template { format, output, .. } = &cli.command {
            assert_eq!(format, &ConfigFormat::Json);
            assert_eq!(output, &None);
        } else {
            panic!("Expected Template command");
        }
    }

    #[test]
    fn test_unknown_template_type() {
        assert!(Cli::try_parse_from(["raster-tools", "template", "weather"]).is_err());
    }

    #[test]
    fn test_completions_command() {
        let cli = Cli::parse_from(["raster-tools", "completions", "bash"]);
        assert!(matches!(cli.command, Commands::Completions { .. }));
    }

    #[test]
    fn test_output_format_values() {
        for (value, expected) in [
            ("human", OutputFormat::Human),
            ("json", OutputFormat::Json),
            ("yaml", OutputFormat::Yaml),
            ("csv", OutputFormat::Csv),
        ] {
            let cli = Cli::parse_from(["raster-tools", "--output-format", value, "info", "dem.tif"]);
            assert_eq!(cli.output_format, expected);
        }
    }

    #[test]
    fn test_quiet_mode() {
        let cli = Cli::parse_from(["raster-tools", "--quiet", "info", "dem.tif"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["raster-tools", "--verbose", "--quiet", "info", "dem.tif"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["raster-tools", "info", "dem.tif", "-v", "--output-format", "json"]);
        assert!(cli.verbose);
        assert_eq!(cli.output_format, OutputFormat::Json);
    }
}
