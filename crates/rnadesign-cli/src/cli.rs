use clap::{Args, Parser, Subcommand};
use rnadesign::engine::config::GenerationMethod;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "RNA Designer CLI - design families of structurally equivalent, mutually non-repetitive RNA variants.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate, filter, and group variants of a wild-type scaffold.
    Design(DesignArgs),
    /// Compute diversity metrics over existing group FASTA files.
    Analyze(AnalyzeArgs),
}

/// Arguments for the `design` subcommand.
#[derive(Args, Debug)]
pub struct DesignArgs {
    // --- Core Arguments ---
    /// Wild-type scaffold sequence (T is read as U).
    #[arg(short = 'w', long, value_name = "SEQUENCE")]
    pub scaffold: Option<String>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory that receives the FASTA and CSV outputs.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    // --- Generation Overrides ---
    /// Generation method: auto, inverse, or conservation.
    #[arg(short, long, value_name = "METHOD")]
    pub mode: Option<GenerationMethod>,

    /// Number of independent generation runs per round.
    #[arg(long, value_name = "INT")]
    pub n_runs: Option<usize>,

    /// Number of additional conservation feedback rounds.
    #[arg(long, value_name = "INT")]
    pub feedback_rounds: Option<usize>,

    /// Seed the conservation profile with a point-mutation scan of the wild type.
    #[arg(long)]
    pub initial_scan: bool,

    /// Random seed for every library-side random choice.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    // --- Filter Overrides ---
    /// Maximum shared substring length between any two variants.
    #[arg(long, value_name = "INT")]
    pub lmax: Option<usize>,

    // --- Grouping Overrides ---
    /// Number of variants per group.
    #[arg(short = 'g', long, value_name = "INT")]
    pub group_size: Option<usize>,

    /// Number of groups to form.
    #[arg(short = 'n', long, value_name = "INT")]
    pub n_groups: Option<usize>,

    // --- Oracle ---
    /// Load fold results from this CSV before the run and save them after it.
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S filter.lmax-threshold=8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// FASTA files to analyze; each file is treated as one group.
    #[arg(required = true, value_name = "FASTA")]
    pub inputs: Vec<PathBuf>,

    /// Directory that receives the distance matrices.
    #[arg(short, long, value_name = "DIR", default_value = "analysis")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_flags_parse() {
        let cli = Cli::parse_from([
            "rnadesign", "-vv", "design", "-w", "GGGAAACCC", "--mode", "inverse", "-g", "5",
            "-n", "2", "--seed", "7", "-S", "filter.lmax-threshold=8",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Design(args) = cli.command else {
            panic!("expected design command");
        };
        assert_eq!(args.scaffold.as_deref(), Some("GGGAAACCC"));
        assert_eq!(args.mode, Some(GenerationMethod::Inverse));
        assert_eq!(args.group_size, Some(5));
        assert_eq!(args.n_groups, Some(2));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.set_values, vec!["filter.lmax-threshold=8"]);
    }

    #[test]
    fn analyze_requires_inputs() {
        assert!(Cli::try_parse_from(["rnadesign", "analyze"]).is_err());
        let cli = Cli::try_parse_from(["rnadesign", "analyze", "a.fasta", "b.fasta"]).unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze command");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.output, PathBuf::from("analysis"));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["rnadesign", "-q", "-v", "analyze", "a.fasta"]).is_err());
    }
}
