pub mod init;
pub mod limit;
pub mod remove;
pub mod reset;
pub mod stats;
pub mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configure tracking settings")]
    Init(init::InitArgs),
    #[command(about = "Track browsing time for a browser host speaking JSON lines on stdin/stdout")]
    Watch,
    #[command(about = "Show time spent per domain")]
    Stats(stats::StatsArgs),
    #[command(about = "Set daily and weekly limits for a domain", arg_required_else_help = true)]
    Limit(limit::LimitArgs),
    #[command(about = "Reset recorded time", arg_required_else_help = true)]
    Reset(reset::ResetArgs),
    #[command(about = "Delete all data of a domain", arg_required_else_help = true)]
    Remove(remove::RemoveArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> Result<()> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args),
            Commands::Watch => watch::cmd().await,
            Commands::Stats(args) => stats::cmd(args).await,
            Commands::Limit(args) => limit::cmd(args).await,
            Commands::Reset(args) => reset::cmd(args).await,
            Commands::Remove(args) => remove::cmd(args).await,
        }
    }
}
