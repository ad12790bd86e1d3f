use clap::Parser;

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Dashboard daemon that keeps a static HTML planner page current")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "json/config.json")]
    pub config: String,

    /// Run one refresh cycle per source, then exit
    #[arg(long)]
    pub once: bool,
}
