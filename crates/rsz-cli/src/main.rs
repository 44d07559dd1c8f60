//! `rsz` command line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rsz_artifact::{EncodingKind, Orientation, ResolutionCatalog};
use rsz_cli::{init_logging, render_outcome, render_report, resolution_lines, AppConfig, Services};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("rsz")
        .version(rsz_cli::VERSION)
        .about("Fan-out image derivatives with delay-gated cleanup")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("process")
                .about("Store an image and all of its derivatives")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Image to process"),
                )
                .arg(
                    Arg::new("mime")
                        .long("mime")
                        .help("Declared MIME type (inferred from the extension if omitted)"),
                )
                .arg(
                    Arg::new("encoding")
                        .long("encoding")
                        .default_value("passthrough")
                        .value_parser(value_parser!(EncodingKind))
                        .help("jpeg, webp, png or passthrough"),
                )
                .arg(
                    Arg::new("orientation")
                        .long("orientation")
                        .default_value("landscape")
                        .value_parser(value_parser!(Orientation))
                        .help("landscape or portrait"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("clean-once")
                .about("Examine the oldest cleanup record and drain it if due")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("clean-daemon").about("Run the cleanup consumer on its interval until Ctrl-C"))
        .subcommand(
            Command::new("resolutions")
                .about("List the derivative sizes")
                .arg(
                    Arg::new("orientation")
                        .long("orientation")
                        .default_value("landscape")
                        .value_parser(value_parser!(Orientation)),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<AppConfig> {
    let path = matches.get_one::<PathBuf>("config");
    AppConfig::load(path.map(PathBuf::as_path))
        .context("loading configuration")?
        .apply_env_overrides(|key| std::env::var(key).ok())
        .context("applying environment overrides")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    init_logging(&config.log).context("installing log subscriber")?;

    match matches.subcommand() {
        Some(("process", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing FILE argument")?;
            let encoding = args.get_one::<EncodingKind>("encoding").copied().unwrap_or_default();
            let orientation = args.get_one::<Orientation>("orientation").copied().unwrap_or_default();
            let mime = args.get_one::<String>("mime").map(String::as_str);

            let services = Services::open(config).await?;
            let outcome = services.process_file(file, mime, encoding, orientation).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{}", render_outcome(&outcome));
            }
        }
        Some(("clean-once", args)) => {
            let services = Services::open(config).await?;
            let report = services.clean_once().await;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_report(&report));
            }
        }
        Some(("clean-daemon", _)) => {
            let services = Services::open(config).await?;
            services
                .clean_daemon(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "cannot listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                })
                .await;
        }
        Some(("resolutions", args)) => {
            let orientation = args.get_one::<Orientation>("orientation").copied().unwrap_or_default();
            for line in resolution_lines(&ResolutionCatalog::standard(), orientation) {
                println!("{line}");
            }
        }
        _ => {}
    }

    Ok(())
}
