//! CLI command handling
//!
//! Loads configuration, discovers the corpus, runs it and prints the report.

mod signal;

use std::time::Duration;

use crate::commands::RunArgs;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::compare::Comparator;
use crate::corpus;
use crate::invoke::{ProcessInvoker, Tool, ToolRole};
use crate::report::{self, EXIT_OK};
use crate::runner::{RunOptions, Runner};

/// Execute a run and return the process exit code
///
/// Errors returned from here are setup failures; everything that goes wrong
/// for an individual entry is part of the report instead.
pub async fn dispatch(args: RunArgs) -> Result<i32> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let mut config = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let corpus = corpus::discover(&args.root, &config.corpus.extension)?;

    if args.list {
        for entry in &corpus.entries {
            println!("{}\t{}", entry.key, entry.path.display());
        }
        for issue in &corpus.issues {
            println!("skipped\t{}", issue);
        }
        return Ok(EXIT_OK);
    }

    let baseline = resolve(&config, ToolRole::Baseline, args.baseline.clone())?;
    let modified = resolve(&config, ToolRole::Modified, args.modified.clone())?;
    tracing::info!(
        "Comparing {} (baseline) against {} (modified)",
        baseline.program.display(),
        modified.program.display()
    );

    let options = RunOptions {
        jobs: config.jobs(),
        timeout: Duration::from_secs(config.run.timeout_secs),
        keep_output: args.keep_output.clone(),
        progress: !args.no_progress,
    };

    let runner = Runner::new(
        ProcessInvoker,
        baseline,
        modified,
        Comparator::from_config(&config),
        config.accepted.clone(),
        options,
    );

    let summary = runner.run(corpus, signal::shutdown()).await;

    print!("{}", report::render(&summary));

    if let Some(path) = &args.results {
        report::write_results(path, &summary)?;
    }

    Ok(summary.exit_code())
}

/// Command-line flags take precedence over the config file
fn apply_overrides(config: &mut Config, args: &RunArgs) -> Result<()> {
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(Error::Config("--jobs must be at least 1".to_string()));
        }
        config.run.jobs = Some(jobs);
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err(Error::Config("--timeout must be at least 1".to_string()));
        }
        config.run.timeout_secs = timeout;
    }
    if let Some(policy) = args.both_fail {
        config.run.both_fail = policy;
    }
    if let Some(extension) = &args.extension {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(Error::Config("--extension must not be empty".to_string()));
        }
        config.corpus.extension = extension.to_string();
    }
    Ok(())
}

fn resolve(config: &Config, role: ToolRole, override_path: Option<std::path::PathBuf>) -> Result<Tool> {
    let tool = config.resolve_tool(role.as_str(), override_path)?;
    Ok(Tool {
        role,
        program: tool.path,
        args: tool.args,
    })
}
