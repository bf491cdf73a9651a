//! The surface photos are shown on. Only "show this URL" and "close" are needed.

use std::future::Future;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::DisplayOptions;

const URL_PLACEHOLDER: &str = "{url}";

pub trait Display: Send {
    fn show(&mut self, url: &str) -> impl Future<Output = Result<()>> + Send;

    /// Release the surface. Must be safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Logs each URL; for headless runs and for when no viewer is configured.
#[derive(Debug, Default)]
pub struct LogDisplay {
    shown: usize,
}

impl LogDisplay {
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl Display for LogDisplay {
    async fn show(&mut self, url: &str) -> Result<()> {
        self.shown += 1;
        info!(%url, "showing photo");
        Ok(())
    }

    async fn close(&mut self) {
        debug!(shown = self.shown, "log display closed");
    }
}

/// Runs an external viewer per photo, replacing the previous viewer process.
#[derive(Debug)]
pub struct CommandDisplay {
    argv: Vec<String>,
    current: Option<Child>,
}

impl CommandDisplay {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        anyhow::ensure!(!argv.is_empty(), "display command must name a program");
        Ok(Self {
            argv,
            current: None,
        })
    }

    fn command_for(&self, url: &str) -> Command {
        let mut command = Command::new(&self.argv[0]);
        let args = &self.argv[1..];
        if args.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
            command.args(args.iter().map(|arg| arg.replace(URL_PLACEHOLDER, url)));
        } else {
            command.args(args).arg(url);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }

    async fn stop_current(&mut self) {
        let Some(mut child) = self.current.take() else {
            return;
        };
        if let Some(pid) = child.id() {
            debug!(pid, "stopping viewer process");
            if let Err(err) = child.start_kill() {
                warn!("failed to stop viewer process: {err}");
            }
        }
        if let Err(err) = child.wait().await {
            warn!("failed to reap viewer process: {err}");
        }
    }
}

impl Display for CommandDisplay {
    async fn show(&mut self, url: &str) -> Result<()> {
        self.stop_current().await;
        let child = self
            .command_for(url)
            .spawn()
            .with_context(|| format!("failed to spawn viewer {}", self.argv[0]))?;
        info!(pid = child.id(), %url, "showing photo");
        self.current = Some(child);
        Ok(())
    }

    async fn close(&mut self) {
        self.stop_current().await;
    }
}

/// Display selected from configuration at startup.
#[derive(Debug)]
pub enum ConfiguredDisplay {
    Log(LogDisplay),
    Command(CommandDisplay),
}

impl ConfiguredDisplay {
    pub fn from_options(options: &DisplayOptions) -> Result<Self> {
        match &options.command {
            Some(argv) => Ok(Self::Command(CommandDisplay::new(argv.clone())?)),
            None => Ok(Self::Log(LogDisplay::default())),
        }
    }
}

impl Display for ConfiguredDisplay {
    async fn show(&mut self, url: &str) -> Result<()> {
        match self {
            Self::Log(display) => display.show(url).await,
            Self::Command(display) => display.show(url).await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Log(display) => display.close().await,
            Self::Command(display) => display.close().await,
        }
    }
}
