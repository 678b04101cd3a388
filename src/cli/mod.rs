// CLI module for sentimark
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;

/// sentimark - prediction-market intelligence, PDF reports and subscriptions
#[derive(Parser, Debug)]
#[command(name = "sentimark", version, about, long_about = None)]
pub struct Args {
    /// Config file to load instead of ~/.sentimark/config.toml
    #[arg(short, long, env = "SENTIMARK_CONFIG")]
    pub config: Option<String>,

    /// Override the bind address from the config
    #[arg(long)]
    pub host: Option<String>,

    /// Override the listen port from the config
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Print the resolved configuration (secrets masked) and exit
    #[arg(long)]
    pub check_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_parse() {
        let args = Args::parse_from(["sentimark", "--port", "4000", "--check-config"]);
        assert_eq!(args.port, Some(4000));
        assert!(args.check_config);
        assert!(args.host.is_none());
    }
}
