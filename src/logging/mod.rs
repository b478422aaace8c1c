use std::{
    io::{self, Write},
    path::Path,
};

use env_logger::Builder;
use log::LevelFilter;
use tokio::{
    fs::{create_dir_all, metadata, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::{config, config_error, core::RouterResult};

pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let data = buf.to_vec();
        self.sender.send(data).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Log setup: stderr by default, or a file when `log.path` is configured.
///
/// File output goes through a channel drained by [`Logger::run`], so
/// logging never blocks on disk I/O.
pub struct Logger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    config: Option<config::Log>,
}

impl Logger {
    pub fn new(config: Option<config::Log>) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            config,
        }
    }

    fn create_async_writer(&self) -> AsyncWriter {
        AsyncWriter {
            sender: self.sender.clone(),
        }
    }

    /// Install the global logger. `RUST_LOG` overrides the default `info` level.
    pub fn init_env_logger(&self) {
        let mut builder = Builder::new();
        builder
            .filter(None, LevelFilter::Info)
            .parse_env(env_logger::Env::default());
        if self.config.is_some() {
            builder.target(env_logger::Target::Pipe(Box::new(self.create_async_writer())));
        }
        if let Err(e) = builder.try_init() {
            eprintln!("Logger already initialized: {e}");
        }
    }

    /// Spawn the file writer task; `None` when logging to stderr.
    pub fn spawn(self) -> Option<JoinHandle<RouterResult<()>>> {
        self.config.is_some().then(|| tokio::spawn(self.run()))
    }

    /// Append every record to the log file until all writers are gone.
    pub async fn run(self) -> RouterResult<()> {
        let Logger {
            sender,
            mut receiver,
            config,
        } = self;
        // only the writers handed to env_logger keep the channel open
        drop(sender);

        let Some(config) = config else {
            return Ok(());
        };
        let log_file_path = &config.path;

        if let Some(parent) = Path::new(log_file_path).parent() {
            if metadata(parent).await.is_err() {
                create_dir_all(parent)
                    .await
                    .map_err(|e| config_error!("Failed to create log path {:?}: {}", parent, e))?;
            }
        }

        let mut file = BufWriter::new(
            OpenOptions::new()
                .append(true)
                .create(true)
                .open(log_file_path)
                .await
                .map_err(|e| config_error!("Failed to open log file {}: {}", log_file_path, e))?,
        );

        while let Some(data) = receiver.recv().await {
            if let Err(e) = file.write_all(&data).await {
                eprintln!("Failed to write to log file: {e}");
                continue;
            }
            // keep the file current whenever the channel runs dry
            if receiver.is_empty() {
                if let Err(e) = file.flush().await {
                    eprintln!("Failed to flush log file: {e}");
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| config_error!("Failed to flush log file: {}", e))
    }
}
