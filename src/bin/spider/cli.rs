// CLI argument definitions using clap

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "spider")]
#[command(version)]
#[command(about = "Google Cloud Storage bucket smoke-test tool", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ./spider.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print bucket metadata, optionally smoke-test upload and delete
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Upload a local file and delete it again
    #[arg(long)]
    pub test_upload: bool,
}
