//! Command line [`Args`].

use std::path::PathBuf;

use clap::Parser;

/// Server of the golf equipment rental marketplace.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file, loaded if it exists.
    #[arg(short, long, value_name = "PATH", default_value = "config.toml")]
    pub config: PathBuf,
}

impl Args {
    /// Parses the command line [`Args`] of the current process.
    ///
    /// # Errors
    ///
    /// If the arguments are malformed, or `--help`/`--version` is requested.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod spec {
    use std::path::Path;

    use clap::Parser as _;

    use super::Args;

    #[test]
    fn defaults_config_path() {
        let args = Args::try_parse_from(["fairway"]).unwrap();

        assert_eq!(args.config, Path::new("config.toml"));
    }

    #[test]
    fn accepts_short_config_flag() {
        let args =
            Args::try_parse_from(["fairway", "-c", "/etc/fairway.toml"]).unwrap();

        assert_eq!(args.config, Path::new("/etc/fairway.toml"));
    }
}
