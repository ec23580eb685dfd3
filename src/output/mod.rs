//! Output formatting and writing modules

pub mod formats;

use std::fs::{File, OpenOptions};
use std::io::{self, Write};

use crate::assessment::AssessmentResult;
use crate::config::{OutputConfig, OutputFormat};
use crate::error::Result;

pub use formats::{format_json, format_text};

/// Output writer that handles multiple destinations
pub struct OutputWriter {
    config: OutputConfig,
    file: Option<File>,
    written: u32,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(config: OutputConfig) -> io::Result<Self> {
        let file = if let Some(ref path) = config.output_path {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?,
            )
        } else {
            None
        };

        Ok(Self {
            config,
            file,
            written: 0,
        })
    }

    /// Write an assessment result
    pub fn write(&mut self, result: &AssessmentResult) -> Result<()> {
        let formatted = self.format(result)?;

        // Write to console if enabled
        if self.config.enable_console {
            self.write_console(&formatted)?;
        }

        // Append to file if configured
        if let Some(ref mut file) = self.file {
            writeln!(file, "{}", formatted)?;
            file.flush()?;
        }

        self.written += 1;
        Ok(())
    }

    /// Format the result according to configured format
    pub fn format(&self, result: &AssessmentResult) -> Result<String> {
        match self.config.format {
            OutputFormat::Json => format_json(result, self.config.pretty),
            OutputFormat::Text => Ok(format_text(result)),
        }
    }

    fn write_console(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", text)?;
        stdout.flush()
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(ref mut file) = self.file {
            file.flush()?;
        }
        Ok(())
    }

    /// Number of results written so far
    pub fn written(&self) -> u32 {
        self.written
    }
}

/// Format seconds as MM:SS.mmm, or HH:MM:SS.mmm past the hour
pub fn format_duration(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    let millis = ms % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}
