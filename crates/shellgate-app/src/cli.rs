use std::path::PathBuf;

use clap::Parser;
use shellgate_config::ShellgateConfig;

/// Shellgate: serve a shell to browser terminals over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "shellgate", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to listen on (0 picks a free port).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Shell to run, by name or path.
    #[arg(short = 's', long)]
    pub shell: Option<String>,

    /// Working directory for spawned shells.
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,

    /// Log filter override, e.g. `shellgate=debug`.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut ShellgateConfig) {
        if let Some(port) = self.port {
            config.terminal.port = port;
        }
        if let Some(shell) = &self.shell {
            config.terminal.shell = shell.clone();
        }
        if let Some(directory) = &self.directory {
            config.terminal.working_directory = directory.clone();
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_config_values() {
        let args = Args::parse_from([
            "shellgate",
            "--port",
            "4000",
            "--shell",
            "zsh",
            "-d",
            "/tmp",
        ]);
        let mut config = ShellgateConfig::default();
        args.apply(&mut config);

        assert_eq!(config.terminal.port, 4000);
        assert_eq!(config.terminal.shell, "zsh");
        assert_eq!(config.terminal.working_directory, PathBuf::from("/tmp"));
    }

    #[test]
    fn no_overrides_keeps_config() {
        let args = Args::parse_from(["shellgate"]);
        let mut config = ShellgateConfig::default();
        let before = config.terminal.port;
        args.apply(&mut config);
        assert_eq!(config.terminal.port, before);
        assert!(args.config.is_none());
    }
}
