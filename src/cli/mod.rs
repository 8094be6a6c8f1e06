//! CLI mode for zencache - install a bucket and serve it cache-first.

mod progress;

use std::path::PathBuf;

use crate::cache::OfflineAssetCache;
use crate::config::AppConfig;
use crate::error::{Error, Result};

use progress::{InstallBar, print_manifest, print_summary};

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Subcommand: `install` or `serve`.
    pub command: Command,
    /// Optional TOML config file path.
    pub config_path: Option<PathBuf>,
    /// Override for the bucket root directory.
    pub cache_dir: Option<PathBuf>,
    /// Override for the cache bucket name.
    pub bucket: Option<String>,
    /// Override for the manifest origin.
    pub origin: Option<String>,
    /// Run the stale-bucket sweep after a successful install.
    pub sweep: bool,
    /// Override for the serve bind port.
    pub port: Option<u16>,
}

/// Supported subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Populate the bucket from the manifest.
    Install,
    /// Run the cache-first HTTP front end.
    Serve,
}

impl CliArgs {
    /// Parses the argument list (without the program name).
    ///
    /// # Errors
    ///
    /// Returns an I/O error wrapped in [`Error::Io`] for unknown commands,
    /// unknown flags, or flags missing their value.
    pub fn parse(args: &[String]) -> Result<Self> {
        fn bad(msg: String) -> Error {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))
        }

        let mut command = None;
        let mut parsed = Self {
            command: Command::Install,
            config_path: None,
            cache_dir: None,
            bucket: None,
            origin: None,
            sweep: false,
            port: None,
        };

        let mut i = 0;
        while i < args.len() {
            let take_value = |i: &mut usize| -> Result<String> {
                let flag = args[*i].clone();
                *i += 1;
                args.get(*i)
                    .cloned()
                    .ok_or_else(|| bad(format!("{flag} requires a value")))
            };

            match args[i].as_str() {
                "install" | "serve" if command.is_none() => {
                    command = Some(if args[i] == "install" {
                        Command::Install
                    } else {
                        Command::Serve
                    });
                }
                "--config" => parsed.config_path = Some(PathBuf::from(take_value(&mut i)?)),
                "--cache-dir" => parsed.cache_dir = Some(PathBuf::from(take_value(&mut i)?)),
                "--bucket" => parsed.bucket = Some(take_value(&mut i)?),
                "--origin" => parsed.origin = Some(take_value(&mut i)?),
                "--sweep" => parsed.sweep = true,
                "--port" => {
                    let raw = take_value(&mut i)?;
                    parsed.port =
                        Some(raw.parse().map_err(|_| bad(format!("invalid port: {raw}")))?);
                }
                other => return Err(bad(format!("unknown argument: {other}"))),
            }
            i += 1;
        }

        parsed.command = command.ok_or_else(|| bad("expected a command: install | serve".to_string()))?;
        Ok(parsed)
    }

    /// Builds the effective configuration: file (if any), then overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn effective_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config_path {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.paths.cache_dir.clone_from(dir);
        }
        if let Some(bucket) = &self.bucket {
            config.cache.bucket.clone_from(bucket);
        }
        if let Some(origin) = &self.origin {
            config.cache.origin.clone_from(origin);
        }
        if let Some(port) = self.port {
            config.serve.port = port;
        }
        Ok(config)
    }
}

/// Runs the CLI with the given arguments.
///
/// # Errors
///
/// Returns an error if argument parsing, install, or serving fails.
pub async fn run(args: Vec<String>) -> Result<()> {
    let cli = CliArgs::parse(&args)?;
    let config = cli.effective_config()?;

    match cli.command {
        Command::Install => install(&cli, config).await,
        Command::Serve => serve(config).await,
    }
}

async fn install(cli: &CliArgs, config: AppConfig) -> Result<()> {
    let cache_dir = config.paths.cache_dir.clone();
    let cache = OfflineAssetCache::open(config.cache, cache_dir)?;

    let manifest = cache.config().asset_manifest();
    print_manifest(&cache.config().bucket, &cache.config().origin, &manifest);

    let bar = InstallBar::new(manifest.len());
    match cache.install(&bar).await {
        Ok(stats) => {
            bar.finish();
            print_summary(&stats);
        }
        Err(e) => {
            bar.abandon();
            eprintln!("{} {e}", console::style("error:").red().bold());
            return Err(e);
        }
    }

    if cli.sweep {
        let deleted = cache.sweep_stale_buckets().await?;
        if deleted.is_empty() {
            println!("  No stale buckets to sweep.");
        } else {
            for bucket in deleted {
                println!("  Swept stale bucket: {bucket}");
            }
        }
    }

    Ok(())
}

#[cfg(feature = "serve")]
async fn serve(config: AppConfig) -> Result<()> {
    let cache = std::sync::Arc::new(OfflineAssetCache::open(config.cache, config.paths.cache_dir)?);
    crate::serve::run(cache, &config.serve.host, config.serve.port)
        .await
        .map_err(Error::Io)
}

#[cfg(not(feature = "serve"))]
async fn serve(_config: AppConfig) -> Result<()> {
    eprintln!("serve support not compiled in");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parse_install_with_overrides() {
        let cli = CliArgs::parse(&args(&[
            "install",
            "--bucket",
            "app-v2",
            "--origin",
            "http://localhost:3000",
            "--sweep",
        ]))
        .unwrap();

        assert_eq!(cli.command, Command::Install);
        assert_eq!(cli.bucket.as_deref(), Some("app-v2"));
        assert_eq!(cli.origin.as_deref(), Some("http://localhost:3000"));
        assert!(cli.sweep);
    }

    #[test]
    fn parse_serve_with_port() {
        let cli = CliArgs::parse(&args(&["serve", "--port", "8099"])).unwrap();
        assert_eq!(cli.command, Command::Serve);
        assert_eq!(cli.port, Some(8099));
    }

    #[test]
    fn parse_rejects_missing_command() {
        assert!(CliArgs::parse(&args(&["--sweep"])).is_err());
    }

    #[test]
    fn parse_rejects_unknown_flag() {
        assert!(CliArgs::parse(&args(&["install", "--frobnicate"])).is_err());
    }

    #[test]
    fn parse_rejects_flag_without_value() {
        assert!(CliArgs::parse(&args(&["install", "--bucket"])).is_err());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cli = CliArgs::parse(&args(&[
            "install",
            "--bucket",
            "app-v9",
            "--cache-dir",
            "/tmp/buckets",
        ]))
        .unwrap();

        let config = cli.effective_config().unwrap();
        assert_eq!(config.cache.bucket, "app-v9");
        assert_eq!(config.paths.cache_dir, PathBuf::from("/tmp/buckets"));
        // Untouched settings keep their defaults.
        assert_eq!(config.cache.concurrent_fetches, 4);
    }
}
