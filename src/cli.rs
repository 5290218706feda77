//! CLI argument parsing for the package ingester.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Handle prefix assigned to new repositories.
pub const DEFAULT_HANDLE_PREFIX: &str = "123456789";

#[derive(Parser, Debug)]
#[command(
    name = "aipingest",
    version,
    about = "Ingest METS Archival Information Packages into a repository snapshot",
    after_help = "Commands:\n  init --repo <dir>                          Create an empty repository (snapshot + config)\n  ingest --repo <dir> --package <path>       Ingest or restore a package\n  validate --package <path>                  Check a package and preview section selection\n  show --repo <dir> --handle <handle>        Print a stored object as JSON\n\nExamples:\n  aipingest init --repo /tmp/repo\n  aipingest init --repo /tmp/repo --print-config > config.json\n  aipingest ingest --repo /tmp/repo --package /tmp/aips/COMMUNITY@123456789-1 --restore\n  aipingest ingest --repo /tmp/repo --package ITEM@123456789-7.xml --manifest-only -o dmd=MODS\n  aipingest validate --package /tmp/aips/ITEM@123456789-7 --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Ingest(IngestArgs),
    Validate(ValidateArgs),
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Initialize a repository directory (snapshot + config.json)")]
pub struct InitArgs {
    /// Repository directory holding repository.json, config.json and assets/
    #[arg(long, value_name = "DIR")]
    pub repo: PathBuf,

    /// Prefix for newly minted handles
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_HANDLE_PREFIX)]
    pub handle_prefix: String,

    /// Overwrite an existing snapshot and config
    #[arg(long)]
    pub force: bool,

    /// Print the default config.json and exit without creating anything
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Parser, Debug)]
#[command(
    about = "Ingest a package (and any child packages) into a repository",
    after_help = aip_ingest::params::parameter_help()
)]
pub struct IngestArgs {
    /// Repository directory holding repository.json, config.json and assets/
    #[arg(long, value_name = "DIR")]
    pub repo: PathBuf,

    /// Package directory (or its mets.xml), or a manifest file with --manifest-only
    #[arg(long, value_name = "PATH")]
    pub package: PathBuf,

    /// Handle of the parent object, overriding the package's parent
    #[arg(long, value_name = "HANDLE")]
    pub parent: Option<String>,

    /// Restore the object named by the package OBJID instead of minting a new one
    #[arg(long)]
    pub restore: bool,

    /// Treat the package as a bare manifest whose content is referenced in place
    #[arg(long)]
    pub manifest_only: bool,

    /// Section type to use as primary descriptive metadata
    #[arg(long, value_name = "TYPE")]
    pub dmd: Option<String>,

    /// Fail on unknown metadata fields instead of creating them
    #[arg(long)]
    pub no_create_metadata_fields: bool,

    /// Package option in key=value form (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Log stage transitions to stderr
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Validate a package and preview metadata section selection")]
pub struct ValidateArgs {
    /// Package directory (or its mets.xml), or a manifest file with --manifest-only
    #[arg(long, value_name = "PATH")]
    pub package: PathBuf,

    /// Treat the package as a bare manifest
    #[arg(long)]
    pub manifest_only: bool,

    /// Section type to use as primary descriptive metadata
    #[arg(long, value_name = "TYPE")]
    pub dmd: Option<String>,

    /// Repository directory whose config.json supplies the crosswalk mapping
    #[arg(long, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print a stored object as JSON")]
pub struct ShowArgs {
    /// Repository directory holding repository.json
    #[arg(long, value_name = "DIR")]
    pub repo: PathBuf,

    /// Handle of the object to print
    #[arg(long, value_name = "HANDLE")]
    pub handle: String,
}
