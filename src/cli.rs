use clap::Parser;

/// Represents CLI arguments.
#[derive(Debug, Parser)]
#[clap(author, version, about = "Imports Wavefront OBJ models and prints their scene tree")]
pub struct Arguments {
    /// Specifies the config file path.
    #[clap(short, long, default_value = "objscene.toml")]
    pub config: String,

    /// OBJ files to import, in addition to the ones listed in the config.
    pub models: Vec<String>,
}
