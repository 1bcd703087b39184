//! Command line parsing for the VulSim compiler.
use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// Compile VulSim bundle and combine descriptors into C++ simulation units.
pub struct Opts {
    /// project directory holding `bundle/`, `combine/` and `cpp/`
    #[argh(positional)]
    pub projdir: PathBuf,

    /// output directory; created if missing, must be empty otherwise
    #[argh(positional)]
    pub output: PathBuf,

    /// logging level
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,

    /// configuration file, merged over `<projdir>/vulsim.toml`
    #[argh(option)]
    pub config: Option<PathBuf>,

    /// set a configuration variable (key=value)
    #[argh(option, short = 's')]
    pub set: Vec<String>,
}

impl Opts {
    pub fn get_opts() -> Self {
        argh::from_env()
    }
}
