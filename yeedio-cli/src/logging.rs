use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};

const LOG_CAPACITY: usize = 500;

/// Most recent log lines, oldest first. Cloning shares the buffer.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap();
        if lines.len() >= LOG_CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().unwrap().iter().cloned().collect()
    }
}

struct AgentLogger {
    level: LevelFilter,
    buffer: LogBuffer,
    echo_stderr: bool,
}

impl Log for AgentLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(record.level(), record.target(), &record.args().to_string());
        if self.echo_stderr {
            eprintln!("{}", line);
        }
        self.buffer.push(line);
    }

    fn flush(&self) {}
}

static LOG_BUFFER: OnceLock<LogBuffer> = OnceLock::new();
static LOGGER: OnceLock<AgentLogger> = OnceLock::new();

/// `[INFO agent::watcher] ...`: the library's crate prefix is dropped so
/// lines name the agent component that wrote them.
fn format_line(level: log::Level, target: &str, message: &str) -> String {
    let component = target
        .strip_prefix("yeedio_lib::")
        .or_else(|| target.strip_prefix("yeedio::"))
        .unwrap_or(target);
    format!("[{} {}] {}", level, component, message)
}

fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install the process logger and return its line buffer.
///
/// `RUST_LOG` picks the level and `YEEDIO_LOG_STDERR` (anything but `0`)
/// echoes every line to stderr.
pub fn init() -> LogBuffer {
    let buffer = LOG_BUFFER.get_or_init(LogBuffer::default).clone();

    let level = parse_level(std::env::var("RUST_LOG").ok().as_deref());
    let echo_stderr = std::env::var("YEEDIO_LOG_STDERR")
        .map(|value| value != "0")
        .unwrap_or(false);

    let logger = LOGGER.get_or_init(|| AgentLogger {
        level,
        buffer: buffer.clone(),
        echo_stderr,
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_name_the_component() {
        assert_eq!(
            format_line(log::Level::Debug, "yeedio_lib::agent::watcher", "rediscovery"),
            "[DEBUG agent::watcher] rediscovery"
        );
        assert_eq!(
            format_line(log::Level::Info, "yeedio::runner", "Starting Yeedio CLI"),
            "[INFO runner] Starting Yeedio CLI"
        );
    }

    #[test]
    fn level_comes_from_environment_value() {
        assert_eq!(parse_level(Some("off")), LevelFilter::Off);
        assert_eq!(parse_level(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(parse_level(Some("chatty")), LevelFilter::Info);
        assert_eq!(parse_level(None), LevelFilter::Info);
    }

    #[test]
    fn buffer_keeps_the_latest_lines() {
        let buffer = LogBuffer::default();
        for index in 0..LOG_CAPACITY + 3 {
            buffer.push(format!("line {}", index));
        }

        let lines = buffer.snapshot();
        assert_eq!(lines.len(), LOG_CAPACITY);
        assert_eq!(lines[0], "line 3");
    }
}
