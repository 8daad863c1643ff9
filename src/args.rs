use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Image (jpg, jpeg, png) to analyze at startup
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Camera index, overrides the configuration
    #[arg(long)]
    pub camera_index: Option<u32>,
}
