use std::{env, panic};

use anyhow::Result;
use clap::Parser;
use log::info;
use txprobe::progress::ConsoleProgress;
use txprobe_cli::{execute, trace, Args};

/// CMD like:
///     txprobe                                  ==>  probe mongodb://localhost:27017
///     txprobe --set engine=memory              ==>  probe the in-process store
///     TXPROBE_URI=mongodb://db:27017 txprobe   ==>  probe another deployment
///
#[tokio::main]
pub async fn main() -> Result<()> {
    setup_panic_hooks();

    let args = Args::parse();
    if args.debug {
        eprintln!("{:?}", args);
    }

    let log_dir = format!(
        "{}/.txprobe",
        env::var("HOME").unwrap_or_else(|_| ".".to_string())
    );
    let _guards = trace::init_logging(&log_dir, &args.log_level)?;
    info!("txprobe start args: {:?}", &args);

    let cfg = args.load_config()?;
    if args.debug {
        eprintln!("{:?}", &cfg);
        eprintln!();
    }
    info!("txprobe start config: {:?}", &cfg);

    execute(&cfg, &mut ConsoleProgress).await?;

    Ok(())
}

fn setup_panic_hooks() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(":", ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();

    if env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info| {
            // First call the default hook that prints to standard error.
            default_hook(info);

            // Then call human_panic.
            let file_path = human_panic::handle_dump(&meta, info);
            let _ = human_panic::print_msg(file_path, &meta);
        }));
    }
}
