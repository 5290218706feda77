use aip_ingest::config::{
    config_path, config_stub, default_config, load_config_or_default, write_config,
};
use aip_ingest::ingest::Ingester;
use aip_ingest::package::PackageSource;
use aip_ingest::params::PackageParameters;
use aip_ingest::repository::{init_store, load_repository, save_repository, Repository};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Command, IngestArgs, InitArgs, RootArgs, ShowArgs, ValidateArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    let verbose = matches!(&args.command, Command::Ingest(ingest) if ingest.verbose);
    init_tracing(verbose);

    match args.command {
        Command::Init(args) => run_init(args),
        Command::Ingest(args) => run_ingest(args),
        Command::Validate(args) => run_validate(args),
        Command::Show(args) => run_show(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_init(args: InitArgs) -> Result<()> {
    if args.print_config {
        println!("{}", config_stub()?);
        return Ok(());
    }
    init_store(&args.repo, &args.handle_prefix, args.force)?;
    if args.force || !config_path(&args.repo).exists() {
        write_config(&args.repo, &default_config())?;
    }
    println!(
        "initialized repository at {} (handle prefix {})",
        args.repo.display(),
        args.handle_prefix
    );
    Ok(())
}

fn run_ingest(args: IngestArgs) -> Result<()> {
    let config = load_config_or_default(&args.repo)?;
    let ingester = Ingester::from_config(config)?;
    let mut repo = load_repository(&args.repo)?;

    let mut params = PackageParameters {
        manifest_only: args.manifest_only,
        create_metadata_fields: !args.no_create_metadata_fields,
        dmd: args.dmd.clone(),
        restore_mode_enabled: args.restore,
    };
    params
        .apply_options(&args.options)
        .context("parse package options")?;

    let source = PackageSource::open(&args.package, params.manifest_only)
        .with_context(|| format!("open package {}", args.package.display()))?;
    let parent = match args.parent.as_deref() {
        Some(handle) => Some(
            repo.find_by_handle(handle)
                .map(|object| object.id)
                .ok_or_else(|| anyhow!("parent {handle} not found in {}", args.repo.display()))?,
        ),
        None => None,
    };

    let outcome = match ingester.ingest(&mut repo, &source, parent, &params) {
        Ok(outcome) => outcome,
        Err(failure) => {
            if args.json {
                print_json(&failure.record())?;
            }
            return Err(failure.into());
        }
    };
    save_repository(&args.repo, &mut repo)?;

    if args.json {
        return print_json(&outcome);
    }
    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    println!(
        "{} {} {} from {}",
        if outcome.replaced { "restored" } else { "ingested" },
        outcome.object_type,
        outcome.handle,
        outcome.location
    );
    let mut pending: Vec<_> = outcome.children.iter().collect();
    while let Some(child) = pending.pop() {
        println!("  {} {} from {}", child.object_type, child.handle, child.location);
        pending.extend(child.children.iter());
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = match args.repo.as_deref() {
        Some(repo) => load_config_or_default(repo)?,
        None => default_config(),
    };
    let ingester = Ingester::from_config(config)?;
    let params = PackageParameters {
        manifest_only: args.manifest_only,
        dmd: args.dmd.clone(),
        ..PackageParameters::default()
    };
    let source = PackageSource::open(&args.package, params.manifest_only)
        .with_context(|| format!("open package {}", args.package.display()))?;

    let preview = match ingester.preview(&source, &params) {
        Ok(preview) => preview,
        Err(failure) => {
            if args.json {
                print_json(&failure.record())?;
            }
            return Err(failure.into());
        }
    };
    if args.json {
        return print_json(&preview);
    }
    for warning in &preview.warnings {
        eprintln!("warning: {warning}");
    }
    println!(
        "{} {} is valid",
        preview.object_type,
        preview.handle.as_deref().unwrap_or("(no OBJID)")
    );
    println!("primary section: {}", preview.primary_section);
    if !preview.supplementary_sections.is_empty() {
        println!("supplementary: {}", preview.supplementary_sections.join(", "));
    }
    if !preview.excluded_sections.is_empty() {
        println!("excluded: {}", preview.excluded_sections.join(", "));
    }
    Ok(())
}

fn run_show(args: ShowArgs) -> Result<()> {
    let repo = load_repository(&args.repo)?;
    let object = repo
        .find_by_handle(&args.handle)
        .ok_or_else(|| anyhow!("no object with handle {} in {}", args.handle, args.repo.display()))?;
    print_json(object)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize JSON output")?;
    println!("{text}");
    Ok(())
}
