mod cli;
mod logger;

use std::path::PathBuf;
use std::process;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, error, info, trace};

use selection_watch::transport::NONE;
use selection_watch::{AsyncWatcher, Change, Content, Transport, WatchConfig, Watcher, XcbTransport};

use crate::cli::{Args, Mode};

fn main() {
    logger::init().expect("Error initializing env_logger");
    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("failure: {:#}", e);
        process::exit(1);
    }
}

fn config_path(args: &Args) -> Result<Option<PathBuf>> {
    if let Some(ref path) = args.config {
        return Ok(Some(path.clone()));
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("clipwatch")
        .context("Failed to locate XDG directories")?;
    Ok(xdg_dirs.find_config_file("config.toml"))
}

fn load_config(args: &Args) -> Result<WatchConfig> {
    let config = match config_path(args)? {
        Some(path) => {
            debug!("Using config file {:?}", path);
            match WatchConfig::load(&path).with_context(|| format!("Failed to load {:?}", path))? {
                Some(config) => config,
                None if args.config.is_some() => bail!("config file {:?} does not exist", path),
                None => WatchConfig::default(),
            }
        }
        None => {
            debug!("No config file, using defaults");
            WatchConfig::default()
        }
    };
    Ok(args.apply(config))
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    trace!("Effective configuration: {:?}", config);

    let watcher = Watcher::init_with(&config).context("Failed to set up the clipboard watcher")?;
    info!("Watching {} as {}", config.selection, config.target);

    let mut buf = vec![0; args.buffer_size];
    match args.mode() {
        Mode::Wait => blocking(watcher, &mut buf, args.show_format),
        Mode::Poll(interval) => polling(watcher, &mut buf, interval, args.show_format),
        Mode::Async => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
                .context("Failed to start the tokio runtime")?;
            runtime.block_on(reactor(watcher, &mut buf, args.show_format))
        }
    }
}

fn blocking<T: Transport>(mut watcher: Watcher<T>, buf: &mut [u8], show_format: bool) -> Result<()> {
    loop {
        let content = watcher.wait(buf)?;
        print_content(&mut watcher, buf, content, show_format)?;
    }
}

fn polling<T: Transport>(mut watcher: Watcher<T>, buf: &mut [u8], interval: std::time::Duration, show_format: bool) -> Result<()> {
    loop {
        match watcher.poll(buf)? {
            Change::Received(content) => print_content(&mut watcher, buf, content, show_format)?,
            Change::Nothing => thread::sleep(interval),
        }
    }
}

async fn reactor(watcher: Watcher<XcbTransport>, buf: &mut [u8], show_format: bool) -> Result<()> {
    let mut watcher = AsyncWatcher::new(watcher)?;
    loop {
        let content = watcher.next(buf).await?;
        print_content(watcher.get_mut(), buf, content, show_format)?;
    }
}

fn print_content<T: Transport>(watcher: &mut Watcher<T>, buf: &[u8], content: Content, show_format: bool) -> Result<()> {
    if content.truncated {
        info!("Content did not fit into {} bytes and was cut off", buf.len());
    }
    if show_format && content.format != NONE {
        let name = watcher.atom_name(content.format).context("Failed to look up the content type")?;
        println!("format: {}", name);
    }
    println!("saw: {}", String::from_utf8_lossy(&buf[..content.len]));
    Ok(())
}
