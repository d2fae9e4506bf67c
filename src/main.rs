use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use raster_tools::cli::{
    Cli, Commands, LoadOverrides, OutputFormat, generate_template, merge_job_config,
    render_template,
};
use raster_tools::filters::{ThresholdFilter, bump_negative_values, bumped_path};
use raster_tools::info::{
    CollectionInfo, get_raster_info, print_collection_info_csv, print_collection_info_human,
    print_collection_info_json, print_collection_info_yaml, print_raster_info_csv,
    print_raster_info_human, print_raster_info_json, print_raster_info_yaml,
};
use raster_tools::input::JobConfig;
use raster_tools::log::{
    config_echo, init_logging, show_farewell_with_timing, show_greeting,
};
use raster_tools::process_job;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Load {
            dir,
            pattern,
            year_regex,
            no_year,
            on_error,
            sort,
            no_progress,
            format,
        } => {
            let base = cli.config.as_ref().map(JobConfig::from_file).transpose()?;
            let config = merge_job_config(
                base,
                LoadOverrides {
                    dir,
                    pattern,
                    year_regex,
                    no_year,
                    on_error,
                    sort,
                },
            )?;
            let format = format.unwrap_or(cli.output_format);
            let human = format == OutputFormat::Human;

            if human && !quiet {
                show_greeting(&config.input_dir.display().to_string());
                config_echo(&config);
            }

            let collection = process_job(&config, !no_progress && !quiet)?;
            let info = CollectionInfo::from_collection(&config.input_dir, &config.pattern, &collection);
            match format {
                OutputFormat::Human => {
                    if !quiet {
                        print_collection_info_human(&info);
                        show_farewell_with_timing(start_time.elapsed());
                    }
                }
                OutputFormat::Json => print_collection_info_json(&info)?,
                OutputFormat::Yaml => print_collection_info_yaml(&info)?,
                OutputFormat::Csv => print_collection_info_csv(&info)?,
            }
        }
        Commands::Info { file, format } => {
            let info = get_raster_info(&file)?;
            match format.unwrap_or(cli.output_format) {
                OutputFormat::Human => print_raster_info_human(&info),
                OutputFormat::Json => print_raster_info_json(&info)?,
                OutputFormat::Yaml => print_raster_info_yaml(&info)?,
                OutputFormat::Csv => print_raster_info_csv(&info)?,
            }
        }
        Commands::Bump {
            input,
            output,
            threshold,
            replacement,
            force,
        } => {
            let output = output.unwrap_or_else(|| bumped_path(&input));
            if output.exists() && !force {
                bail!(
                    "Output file {} already exists. Use --force to overwrite",
                    output.display()
                );
            }
            let filter = ThresholdFilter::new(threshold, replacement);
            let report = bump_negative_values(&input, Some(&output), &filter)
                .with_context(|| format!("Failed to filter {}", input.display()))?;
            if !quiet {
                println!("Written: {}", report.output.display());
                println!("Cells changed: {}", report.cells_changed);
                match report.min_value {
                    Some(min) => println!("Minimum value: {}", min),
                    None => println!("Minimum value: none (no valid cells)"),
                }
            }
        }
        Commands::Validate {
            config_file,
            detailed,
        } => {
            let Some(path) = config_file.or(cli.config) else {
                bail!("No configuration file given. Pass CONFIG_FILE or use --config");
            };
            let config = JobConfig::from_file(&path)?;
            config.validate()?;
            if detailed {
                println!("Configuration: {}", path.display());
                println!("  Input directory: {}", config.input_dir.display());
                if config.input_dir.is_dir() {
                    println!("    exists");
                } else {
                    println!("    WARNING: not found or not a directory");
                }
                println!("  Pattern: {}", config.pattern);
                println!("  Year extraction: {}", config.year.kind());
                println!("  On error: {:?}", config.on_error);
                println!("  Sorted: {}", config.sort_paths);
            }
            if !quiet {
                println!("Configuration is valid: {}", path.display());
            }
        }
        Commands::Template {
            template_type,
            output,
            format,
        } => {
            let config = generate_template(&template_type);
            let rendered = render_template(&config, &format)?;
            write_output(output, rendered.as_bytes())?;
        }
        Commands::Completions { shell, output } => {
            let mut buffer = Vec::new();
            clap_complete::generate(shell, &mut Cli::command(), "raster-tools", &mut buffer);
            write_output(output, &buffer)?;
        }
    }
    Ok(())
}

fn write_output(path: Option<PathBuf>, content: &[u8]) -> Result<()> {
    match path {
        Some(path) => fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            io::stdout().write_all(content)?;
            Ok(())
        }
    }
}
