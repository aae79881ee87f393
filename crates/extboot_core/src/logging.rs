//! Process logging bootstrap and context-scoped bootstrap log.
//!
//! # Responsibility
//! - Route [`BootstrapLog`] output into rolling log files, set up once per process.
//! - Provide the sinks a [`BootstrapLog`] can write to.
//!
//! # Invariants
//! - Repeating [`init_logging`] with the same level and directory returns the
//!   active status; any other configuration is rejected.
//! - Logging initialization must not panic.
//! - Engine code logs through a `BootstrapLog` it was given, never a global.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{Level, LevelFilter};
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use std::fmt::{self, Arguments};
use std::path::{Path, PathBuf};
use std::rc::Rc;

const LOG_FILE_BASENAME: &str = "extboot";
/// Default target for engine events.
pub const BOOTSTRAP_LOG_TARGET: &str = "extboot::bootstrap";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_MESSAGE_CHARS: usize = 160;

static ACTIVE_LOGGING: OnceCell<ActiveLogging> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct ActiveLogging {
    status: LoggingStatus,
    _handle: LoggerHandle,
}

/// Level and directory of the active file logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingStatus {
    level: LevelFilter,
    log_dir: PathBuf,
}

impl LoggingStatus {
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Bootstrap logger whose lines land in the active log files.
    pub fn bootstrap_log(&self) -> BootstrapLog {
        BootstrapLog::facade()
    }

    fn conflict_with(&self, requested: &LoggingStatus) -> Option<String> {
        if self.log_dir != requested.log_dir {
            return Some(format!(
                "bootstrap logging already writes to `{}`; refusing to switch to `{}`",
                self.log_dir.display(),
                requested.log_dir.display()
            ));
        }
        if self.level != requested.level {
            return Some(format!(
                "bootstrap logging already runs at `{}`; refusing to switch to `{}`",
                self.level, requested.level
            ));
        }
        None
    }
}

impl fmt::Display for LoggingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level={} log_dir={}",
            self.level.as_str().to_ascii_lowercase(),
            self.log_dir.display()
        )
    }
}

/// Starts rolling file logs for bootstrap runs and returns the active status.
///
/// # Errors
/// - `level` is not one of trace, debug, info, warn, or error.
/// - `log_dir` is empty, relative, or cannot be created.
/// - Logging is already active with a different level or directory.
/// - The flexi_logger backend fails to start.
pub fn init_logging(level: &str, log_dir: &str) -> Result<LoggingStatus, String> {
    let requested = LoggingStatus {
        level: parse_level(level)?,
        log_dir: absolute_log_dir(log_dir)?,
    };

    let active = ACTIVE_LOGGING.get_or_try_init(|| start_file_logging(&requested))?;
    match active.status.conflict_with(&requested) {
        Some(conflict) => Err(conflict),
        None => Ok(active.status.clone()),
    }
}

/// Level used when the caller names none: `debug` in debug builds, else `info`.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_file_logging(status: &LoggingStatus) -> Result<ActiveLogging, String> {
    std::fs::create_dir_all(&status.log_dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            status.log_dir.display()
        )
    })?;

    let handle = Logger::with(LogSpecification::builder().default(status.level).build())
        .log_to_file(
            FileSpec::default()
                .directory(status.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start bootstrap logger: {err}"))?;

    install_panic_hook_once();
    status.bootstrap_log().info(format_args!(
        "event=logging_init module=bootstrap status=ok {status} version={}",
        env!("CARGO_PKG_VERSION")
    ));

    Ok(ActiveLogging {
        status: status.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    let trimmed = level.trim();
    let parsed = if trimmed.eq_ignore_ascii_case("warning") {
        Ok(LevelFilter::Warn)
    } else {
        trimmed.parse::<LevelFilter>()
    };
    match parsed {
        Ok(filter) if filter != LevelFilter::Off => Ok(filter),
        _ => Err(format!(
            "unsupported log level `{trimmed}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn absolute_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let path = Path::new(log_dir.trim());
    if path.as_os_str().is_empty() {
        return Err("log directory cannot be empty".to_string());
    }
    if !path.is_absolute() {
        return Err(format!(
            "log directory must be absolute, got `{}`",
            path.display()
        ));
    }
    Ok(path.to_path_buf())
}

/// Panics during a refresh end up in the log file as one bounded line.
fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic payload");
        log::error!(
            target: BOOTSTRAP_LOG_TARGET,
            "event=panic_captured module=bootstrap status=error location={} message={:?}",
            location,
            single_line(message, MAX_PANIC_MESSAGE_CHARS)
        );
        previous_hook(panic_info);
    }));
}

fn single_line(value: &str, max_chars: usize) -> String {
    let mut line: String = value
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .take(max_chars)
        .collect();
    if value.chars().count() > max_chars {
        line.push_str("...");
    }
    line
}

/// Destination for bootstrap log lines.
pub trait LogSink {
    fn record(&self, level: Level, target: &str, message: &str);
}

/// Forwards to the process-wide `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn record(&self, level: Level, target: &str, message: &str) {
        log::log!(target: target, level, "{message}");
    }
}

/// Keeps every line in memory; used by tests and report tooling.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: RefCell<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded lines.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// Recorded lines at `level` that contain `needle`.
    pub fn matching(&self, level: Level, needle: &str) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|(line_level, line)| *line_level == level && line.contains(needle))
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn record(&self, level: Level, _target: &str, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

/// Context-scoped logger passed into bootstrap entry points.
#[derive(Clone)]
pub struct BootstrapLog {
    target: &'static str,
    sink: Rc<dyn LogSink>,
}

impl BootstrapLog {
    /// Logger writing to the `log` facade under [`BOOTSTRAP_LOG_TARGET`].
    pub fn facade() -> Self {
        Self::with_sink(BOOTSTRAP_LOG_TARGET, Rc::new(FacadeSink))
    }

    pub fn with_sink(target: &'static str, sink: Rc<dyn LogSink>) -> Self {
        Self { target, sink }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn log(&self, level: Level, args: Arguments<'_>) {
        self.sink.record(level, self.target, &args.to_string());
    }

    pub fn debug(&self, args: Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

impl Default for BootstrapLog {
    fn default() -> Self {
        Self::facade()
    }
}
