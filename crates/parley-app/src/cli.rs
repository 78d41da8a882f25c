use clap::Parser;

/// Parley: a conversational assistant shell.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log filter override (e.g. `parley=debug`).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Resume a saved session by id.
    #[arg(short = 's', long)]
    pub session: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let args = Args::parse_from([
            "parley",
            "--config",
            "/tmp/parley.toml",
            "--log-level",
            "parley=debug",
            "-s",
            "abc",
        ]);
        assert_eq!(args.config.as_deref(), Some("/tmp/parley.toml"));
        assert_eq!(args.log_level.as_deref(), Some("parley=debug"));
        assert_eq!(args.session.as_deref(), Some("abc"));
    }

    #[test]
    fn flags_are_optional() {
        let args = Args::parse_from(["parley"]);
        assert!(args.config.is_none());
        assert!(args.log_level.is_none());
        assert!(args.session.is_none());
    }
}
