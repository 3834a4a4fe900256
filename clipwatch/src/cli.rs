use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use selection_watch::WatchConfig;

/// Print whatever gets copied to the X clipboard.
#[derive(Parser, Debug)]
#[command(name = "clipwatch", version)]
pub struct Args {
    /// TOML config file [default: $XDG_CONFIG_HOME/clipwatch/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// X display to connect to, overrides the config file and $DISPLAY
    #[arg(short, long, env = "CLIPWATCH_DISPLAY")]
    pub display: Option<String>,

    /// Selection to watch, e.g. CLIPBOARD or PRIMARY
    #[arg(short, long)]
    pub selection: Option<String>,

    /// Format to ask the selection owner for, e.g. UTF8_STRING
    #[arg(short, long)]
    pub target: Option<String>,

    /// Capacity of the receive buffer; larger content is cut off
    #[arg(short, long, default_value_t = 4 * 1024 * 1024)]
    pub buffer_size: usize,

    /// Poll every MILLIS milliseconds instead of blocking
    #[arg(short, long, value_name = "MILLIS", conflicts_with = "use_async")]
    pub poll: Option<u64>,

    /// Wait on a tokio reactor instead of blocking
    #[arg(long = "async")]
    pub use_async: bool,

    /// Also print the type the owner converted to
    #[arg(short = 'f', long)]
    pub show_format: bool,
}

pub enum Mode {
    Wait,
    Poll(Duration),
    Async,
}

impl Args {
    pub fn mode(&self) -> Mode {
        match self.poll {
            Some(millis) => Mode::Poll(Duration::from_millis(millis)),
            None if self.use_async => Mode::Async,
            None => Mode::Wait,
        }
    }

    /// Command line options win over the config file.
    pub fn apply(&self, mut config: WatchConfig) -> WatchConfig {
        if let Some(ref display) = self.display {
            config.display = Some(display.clone());
        }
        if let Some(ref selection) = self.selection {
            config.selection = selection.clone();
        }
        if let Some(ref target) = self.target {
            config.target = target.clone();
        }
        config
    }
}
