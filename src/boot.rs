use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::{self, Write};

/// Copies every log record into the log file before echoing it on the console.
struct Tee<F: Write, C: Write> {
    file: F,
    console: C,
}

impl<F: Write, C: Write> Write for Tee<F, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.console.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.console.flush()
    }
}

/// Install the global logger.
///
/// With a log file (explicit, or `KAZE_LOG_FILE`) every record goes to both the
/// file and stdout; otherwise plain `env_logger` on stderr. `RUST_LOG` always
/// overrides the default `info` level.
pub fn init_logging(log_file: Option<&str>) {
    let path = log_file
        .map(str::to_string)
        .or_else(|| std::env::var("KAZE_LOG_FILE").ok());

    match path {
        Some(path) => {
            if let Err(err) = init_file_logger(&path) {
                eprintln!("Failed to initialize file logger at '{path}': {err}");
                init_stderr_logger();
            }
        }
        None => init_stderr_logger(),
    }
}

fn init_stderr_logger() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

fn init_file_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let tee = Tee {
        file,
        console: io::stdout(),
    };

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(tee)))
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Logging to {path} and terminal");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tee_writes_both_sinks() {
        let mut tee = Tee {
            file: Vec::new(),
            console: Vec::new(),
        };
        write!(tee, "2024-01-15 10:30:00 - INFO - served").unwrap();
        tee.flush().unwrap();
        assert_eq!(tee.file, tee.console);
        assert_eq!(tee.file, b"2024-01-15 10:30:00 - INFO - served");
    }
}
