use clap::Parser;
use std::path::PathBuf;

/// rasterprep - prepare candidate raster products for metrics evaluation
#[derive(Parser, Debug)]
#[command(name = "rasterprep")]
#[command(about = "Prepare candidate raster products for metrics evaluation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Reference file directory
    #[arg(long)]
    pub ref_dir: PathBuf,

    /// Reference file prefix
    #[arg(long)]
    pub ref_prefix: String,

    /// Test Digital Surface Model (DSM) file
    #[arg(long)]
    pub dsm: PathBuf,

    /// Test Class Label (CLS) file
    #[arg(long)]
    pub cls: PathBuf,

    /// Test Material (MTL) file
    #[arg(long)]
    pub mtl: Option<PathBuf>,

    /// Test Digital Terrain Model (DTM) file
    #[arg(long)]
    pub dtm: Option<PathBuf>,

    /// Output directory (a timestamped directory is created when omitted)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Custom config document template file
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Metrics engine command to invoke
    #[arg(long)]
    pub engine: Option<String>,

    /// Tool configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,
}
