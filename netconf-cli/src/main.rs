use config::CliConfig;
use env_logger::{Builder, Target};
use log::LevelFilter;

mod cli;
mod commands;
mod config;

fn init_logging(verbosity: &u8) {
    let mut builder = Builder::new();
    match verbosity {
        1 => {
            builder.filter_level(LevelFilter::Debug);
            builder.filter_module("netconf_codec", LevelFilter::Off)
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
            builder.filter_module("netconf_codec::document", LevelFilter::Off);
            builder.filter_module("netconf_codec", LevelFilter::Debug)
        }
        3 => {
            builder.filter_level(LevelFilter::Trace);
            builder.filter_module("netconf_codec", LevelFilter::Trace)
        }
        _ => {
            builder.filter_level(LevelFilter::Info);
            builder.filter_module("netconf_codec", LevelFilter::Warn)
        }
    };
    builder.target(Target::Stderr);
    builder.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = cli::cli().get_matches();
    match args.remove_subcommand() {
        Some((cmd, args)) => {
            let cli_config = CliConfig::new(args)?;
            if !cli_config.inner.quiet {
                init_logging(&cli_config.inner.verbosity);
            }
            cli::exec(&cmd, cli_config).await?;
        }
        _ => {
            cli::cli().print_help()?;
        }
    }
    Ok(())
}
