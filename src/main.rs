use clap::Parser;
use linktag::application::{init, CheckOptions, CheckService, ListTagsService};
use linktag::cli::{comparison_from_flags, format_inventory, format_report, write_json_report};
use linktag::cli::{Cli, Commands};
use linktag::error::LinktagError;
use linktag::infrastructure::{Config, GitCli};
use linktag::logging::init_logging;
use std::time::Duration;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Warning: {:#}", e);
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e.display_with_suggestions());
            std::process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<i32, LinktagError> {
    match cli.command {
        Commands::Check {
            scan,
            commit,
            base,
            head,
            no_vcs,
            output_report,
            json,
            strict,
        } => {
            let mut config = Config::load(&cli.config)?;
            scan.apply(&mut config);
            if output_report.is_some() {
                config.output_report = output_report;
            }

            if !config.directory.is_dir() {
                return Err(LinktagError::RootNotFound(config.directory));
            }

            let comparison = comparison_from_flags(commit, base, head, no_vcs);
            let vcs = match comparison {
                Some(_) => Some(GitCli::open(
                    &config.directory,
                    Duration::from_secs(config.vcs_timeout_secs),
                )?),
                None => None,
            };

            let options = CheckOptions::from_config(&config, comparison);
            let report = CheckService::new(vcs).execute(&options)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", format_report(&report));
            }

            if let Some(path) = &config.output_report {
                write_json_report(&report, path)?;
                tracing::debug!(path = %path.display(), "wrote report");
            }

            Ok(if report.has_failures(strict) { 1 } else { 0 })
        }
        Commands::Tags { scan, filter } => {
            let mut config = Config::load(&cli.config)?;
            scan.apply(&mut config);

            let options = CheckOptions::from_config(&config, None);
            let inventory =
                ListTagsService::execute(&options.root, &options.scan, filter.as_deref())?;
            print!("{}", format_inventory(&inventory));
            Ok(0)
        }
        Commands::Init { path } => {
            let written = init::init(&path)?;
            println!("Wrote {}", written.display());
            Ok(0)
        }
    }
}
