//! Run log kept next to the result files

use super::OutputError;
use crate::config::OutputConfig;
use bevy::log::info;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// Timestamped milestones of a run. The file is appended to, so a continued
/// run extends the log of the run it picks up.
pub struct RunLog {
    writer: BufWriter<File>,
}

impl RunLog {
    pub fn open(config: &OutputConfig) -> Result<Self, OutputError> {
        let directory = Path::new(&config.directory);
        fs::create_dir_all(directory)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(directory.join(&config.log))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Appends `message` with the local time. With `echo` the message also
    /// goes to the application log.
    pub fn write(&mut self, message: &str, echo: bool) -> Result<(), OutputError> {
        writeln!(self.writer, "{} {message}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        self.writer.flush()?;
        if echo {
            info!("{message}");
        }
        Ok(())
    }

    /// Records how the program was invoked.
    pub fn start_parameters<I, S>(&mut self, args: I) -> Result<(), OutputError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = args
            .into_iter()
            .map(|arg| arg.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.write(&format!("CommandLine: {line}"), false)
    }

    /// Records `message` followed by the wall time since `since`.
    pub fn time_span(&mut self, message: &str, since: Instant, echo: bool) -> Result<(), OutputError> {
        self.write(&format!("{message} {}", format_span(since.elapsed())), echo)
    }
}

/// `[N day(s) ]HH:MM:SS.mmm`
pub fn format_span(span: Duration) -> String {
    let millis = span.as_millis();
    let seconds = millis / 1000;
    let days = seconds / 86_400;
    let clock = format!(
        "{:02}:{:02}:{:02}.{:03}",
        seconds % 86_400 / 3600,
        seconds % 3600 / 60,
        seconds % 60,
        millis % 1000
    );
    match days {
        0 => clock,
        1 => format!("1 day {clock}"),
        _ => format!("{days} days {clock}"),
    }
}
