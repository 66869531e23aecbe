use anyhow::{bail, Result};
use copythat_cli::{check_names, cli, ping, read_report, run_sync, summarize, SyncArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("sync", args)) => {
            let sync = SyncArgs {
                document: required_path(args, "document")?,
                data: required_path(args, "data")?,
                output: args.get_one::<PathBuf>("output").cloned(),
                config: args.get_one::<PathBuf>("config").cloned(),
                replace_empty: args.get_flag("replace-empty"),
                max_concurrency: args.get_one::<usize>("max-concurrency").copied(),
            };

            let outcome = run_sync(&sync).await?;
            println!("{}", summarize(&outcome));
        }
        Some(("report", args)) => {
            let document = required_path(args, "document")?;
            println!("{}", read_report(&document).await?);
        }
        Some(("ping", args)) => {
            let document = required_path(args, "document")?;
            let Some(layer) = args.get_one::<String>("layer") else {
                bail!("missing layer name");
            };
            println!("{}", ping(&document, layer).await?);
        }
        Some(("check", args)) => {
            let names: Vec<String> = args
                .get_many::<String>("names")
                .map(|names| names.cloned().collect())
                .unwrap_or_default();
            let config = args.get_one::<PathBuf>("config");
            for line in check_names(config.map(PathBuf::as_path), &names)? {
                println!("{line}");
            }
        }
        _ => {}
    }

    Ok(())
}

fn required_path(args: &clap::ArgMatches, name: &str) -> Result<PathBuf> {
    match args.get_one::<PathBuf>(name) {
        Some(path) => Ok(path.clone()),
        None => bail!("missing --{name}"),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
