use std::path::PathBuf;

#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "tomoproj", about = "Forward-project or FDK-reconstruct the scene described in a TOML file")]
pub struct Cli {

    #[clap(subcommand)]
    pub command: Command,

    /// Number of simulated compute devices
    #[clap(long, default_value = "1")]
    pub devices: usize,

    /// Worker threads per device (0: let rayon decide)
    #[clap(short = 'j', long, default_value = "0")]
    pub threads: usize,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {

    /// Project a 2-D volume into a sinogram
    Fp(Args),

    /// Reconstruct a 3-D volume from cone-beam projections
    Fdk(Args),
}

#[derive(clap::Args, Debug, Clone)]
pub struct Args {

    /// Scene file: volume grid, projection geometry and algorithm options
    pub scene: PathBuf,

    /// Raw little-endian f32 input. Without it, a built-in phantom is used
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// Where to write the raw f32 result
    #[clap(short, long, default_value = "out.raw")]
    pub output: PathBuf,

    /// Log the algorithm's settings after running it
    #[clap(long)]
    pub info: bool,
}
