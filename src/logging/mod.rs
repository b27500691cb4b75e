//! In-process logging with per-channel disciplines.
//!
//! A channel combines an optional console sink with one of three storage
//! disciplines: none, a linear grow-on-demand buffer, or a cyclic buffer
//! with a fixed entry capacity. The cyclic byte arena is allocated at
//! twice its logical size and split into two halves; a generation counter
//! selects the half new writes target, so an observer still holding
//! entries from the previous generation reads intact bytes until the next
//! wrap.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

/// Severity, ordered `Trace < Debug < Info < Warn < Error < Fatal < Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
    Off = 6,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Trace => "[TRACE]",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Info => "[INFO ]",
            LogLevel::Warn => "[WARN ]",
            LogLevel::Error => "[ERROR]",
            LogLevel::Fatal => "[FATAL]",
            LogLevel::Off => "[OFF  ]",
        }
    }

    fn sgr(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[32m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[37m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[37m\x1b[41m",
            LogLevel::Off => "",
        }
    }
}

/// Compile-time floor mirrored from the cargo features; call sites below
/// the floor collapse to nothing inside the logging macros.
pub const COMPILE_TIME_FLOOR: u32 = if cfg!(feature = "max-level-off") {
    LogLevel::Off as u32
} else if cfg!(feature = "max-level-warn") {
    LogLevel::Warn as u32
} else if cfg!(feature = "max-level-info") {
    LogLevel::Info as u32
} else {
    LogLevel::Trace as u32
};

/// True when `level` survives the compile-time floor.
pub const fn level_enabled(level: LogLevel) -> bool {
    level as u32 >= COMPILE_TIME_FLOOR
}

/// Identifier of a channel within one [`LogContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelId(usize);

impl ChannelId {
    /// The context's built-in default channel.
    pub const DEFAULT: ChannelId = ChannelId(0);
}

/// Storage discipline requested at channel creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageInit {
    None,
    Linear { entry_capacity: usize },
    Cyclic { entry_capacity: usize },
}

/// Channel creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChannelInit {
    pub console: bool,
    pub storage: StorageInit,
}

impl ChannelInit {
    pub fn console() -> Self {
        Self {
            console: true,
            storage: StorageInit::None,
        }
    }

    pub fn cyclic(entry_capacity: usize) -> Self {
        Self {
            console: false,
            storage: StorageInit::Cyclic { entry_capacity },
        }
    }

    pub fn linear(entry_capacity: usize) -> Self {
        Self {
            console: false,
            storage: StorageInit::Linear { entry_capacity },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LogEntry {
    level: LogLevel,
    offset: usize,
    len: usize,
}

enum ChannelStorage {
    None,
    /// Grow-on-demand entry list over a growing byte arena.
    Linear {
        entries: Vec<LogEntry>,
        buffer: Vec<u8>,
        used: usize,
    },
    /// Fixed entry ring over a double-half byte arena.
    Cyclic {
        entries: Vec<LogEntry>,
        capacity: usize,
        next_entry: usize,
        total: u64,
        generation: u64,
        buffer: Vec<u8>,
        half_capacity: usize,
        used: usize,
    },
}

struct LogChannel {
    name: String,
    console: bool,
    level: LogLevel,
    init: StorageInit,
    storage: ChannelStorage,
}

impl LogChannel {
    fn new(name: &str, init: ChannelInit) -> Self {
        Self {
            name: name.to_string(),
            console: init.console,
            level: LogLevel::Trace,
            init: init.storage,
            storage: Self::storage_for(init.storage),
        }
    }

    fn storage_for(init: StorageInit) -> ChannelStorage {
        match init {
            StorageInit::None => ChannelStorage::None,
            StorageInit::Linear { entry_capacity } => ChannelStorage::Linear {
                entries: Vec::with_capacity(entry_capacity.max(1)),
                buffer: Vec::new(),
                used: 0,
            },
            StorageInit::Cyclic { entry_capacity } => ChannelStorage::Cyclic {
                entries: Vec::with_capacity(entry_capacity.max(1)),
                capacity: entry_capacity.max(1),
                next_entry: 0,
                total: 0,
                generation: 0,
                buffer: Vec::new(),
                half_capacity: 0,
                used: 0,
            },
        }
    }

    fn record(&mut self, level: LogLevel, message: &str) {
        if self.console {
            let (color, pop) = if cfg!(windows) {
                ("", "")
            } else {
                (level.sgr(), "\x1b[0m")
            };
            println!(
                "{}{} ({}) {}{}",
                color,
                level.prefix(),
                self.name,
                message,
                pop
            );
        }

        match &mut self.storage {
            ChannelStorage::None => {}
            ChannelStorage::Linear {
                entries,
                buffer,
                used,
            } => {
                let bytes = message.as_bytes();
                if *used + bytes.len() > buffer.len() {
                    let new_capacity = (buffer.len() * 2).max((*used + bytes.len()) * 2);
                    buffer.resize(new_capacity, 0);
                }
                buffer[*used..*used + bytes.len()].copy_from_slice(bytes);
                entries.push(LogEntry {
                    level,
                    offset: *used,
                    len: bytes.len(),
                });
                *used += bytes.len();
            }
            ChannelStorage::Cyclic {
                entries,
                capacity,
                next_entry,
                total,
                generation,
                buffer,
                half_capacity,
                used,
            } => {
                let bytes = message.as_bytes();

                // grow the arena, rebasing old-half offsets
                if *used + bytes.len() > *half_capacity {
                    let new_half = (*half_capacity * 2).max((*used + bytes.len()) * 2);
                    let mut grown = vec![0u8; new_half * 2];
                    grown[..*half_capacity].copy_from_slice(&buffer[..*half_capacity]);
                    grown[new_half..new_half + *half_capacity]
                        .copy_from_slice(&buffer[*half_capacity..]);
                    for entry in entries.iter_mut() {
                        if entry.offset >= *half_capacity {
                            entry.offset = entry.offset - *half_capacity + new_half;
                        }
                    }
                    *buffer = grown;
                    *half_capacity = new_half;
                }

                let offset = *used + *half_capacity * (*generation % 2) as usize;
                buffer[offset..offset + bytes.len()].copy_from_slice(bytes);

                let entry = LogEntry {
                    level,
                    offset,
                    len: bytes.len(),
                };
                if entries.len() < *capacity {
                    entries.push(entry);
                } else {
                    entries[*next_entry] = entry;
                }
                *used += bytes.len();
                *total += 1;
                *next_entry = (*next_entry + 1) % *capacity;
                if *next_entry == 0 {
                    // wraparound: new writes target the other half
                    *used = 0;
                    *generation += 1;
                }
            }
        }
    }

    fn snapshot(&self) -> Vec<(LogLevel, String)> {
        let text = |buffer: &[u8], entry: &LogEntry| {
            String::from_utf8_lossy(&buffer[entry.offset..entry.offset + entry.len]).into_owned()
        };
        match &self.storage {
            ChannelStorage::None => Vec::new(),
            ChannelStorage::Linear {
                entries, buffer, ..
            } => entries
                .iter()
                .map(|entry| (entry.level, text(buffer, entry)))
                .collect(),
            ChannelStorage::Cyclic {
                entries,
                capacity,
                next_entry,
                total,
                buffer,
                ..
            } => {
                // chronological: oldest slot first once the ring wrapped
                let start = if *total >= *capacity as u64 {
                    *next_entry
                } else {
                    0
                };
                (0..entries.len())
                    .map(|i| {
                        let entry = &entries[(start + i) % entries.len()];
                        (entry.level, text(buffer, entry))
                    })
                    .collect()
            }
        }
    }
}

/// The per-process log context: a list of channels, each behind its own
/// lock; console output serializes behind stdout.
pub struct LogContext {
    channels: RwLock<Vec<Arc<Mutex<LogChannel>>>>,
}

impl LogContext {
    /// Creates the context with channel 0 as a console "Default" channel.
    pub fn new() -> Self {
        let context = Self {
            channels: RwLock::new(Vec::new()),
        };
        context.add_channel("Default", ChannelInit::console());
        context
    }

    pub fn add_channel(&self, name: &str, init: ChannelInit) -> ChannelId {
        let mut channels = self.channels.write();
        channels.push(Arc::new(Mutex::new(LogChannel::new(name, init))));
        ChannelId(channels.len() - 1)
    }

    /// Gates emission: only levels at or above `level` are recorded.
    pub fn set_level(&self, id: ChannelId, level: LogLevel) {
        if let Some(channel) = self.channel(id) {
            channel.lock().level = level;
        }
    }

    pub fn log(&self, id: ChannelId, level: LogLevel, message: &str) {
        let Some(channel) = self.channel(id) else {
            return;
        };
        let mut channel = channel.lock();
        if level >= channel.level && level < LogLevel::Off {
            channel.record(level, message);
        }
    }

    pub fn log_f(&self, id: ChannelId, level: LogLevel, args: fmt::Arguments<'_>) {
        let Some(channel) = self.channel(id) else {
            return;
        };
        let mut channel = channel.lock();
        if level >= channel.level && level < LogLevel::Off {
            let message = fmt::format(args);
            channel.record(level, &message);
        }
    }

    /// Frees the channel's storage; it records nothing until `reset`
    /// re-arms the configured capacity.
    pub fn clear(&self, id: ChannelId) {
        if let Some(channel) = self.channel(id) {
            let mut channel = channel.lock();
            channel.storage = ChannelStorage::None;
        }
    }

    /// Zeroes entries without changing the configured storage shape.
    pub fn reset(&self, id: ChannelId) {
        if let Some(channel) = self.channel(id) {
            let mut channel = channel.lock();
            let init = channel.init;
            channel.storage = LogChannel::storage_for(init);
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    pub fn channel_by_name(&self, name: &str) -> Option<ChannelId> {
        let channels = self.channels.read();
        channels
            .iter()
            .position(|channel| channel.lock().name == name)
            .map(ChannelId)
    }

    /// Chronological snapshot of the channel's stored entries.
    pub fn entries(&self, id: ChannelId) -> Vec<(LogLevel, String)> {
        self.channel(id)
            .map(|channel| channel.lock().snapshot())
            .unwrap_or_default()
    }

    fn channel(&self, id: ChannelId) -> Option<Arc<Mutex<LogChannel>>> {
        self.channels.read().get(id.0).cloned()
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridge routing `log` facade records into a channel, so runtime modules
/// logging through `log::info!` land in the same place as channel users.
pub struct ChannelLogger {
    context: Arc<LogContext>,
    channel: ChannelId,
}

impl ChannelLogger {
    pub fn new(context: Arc<LogContext>, channel: ChannelId) -> Self {
        Self { context, channel }
    }

    /// Installs this bridge as the global `log` logger.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        log::set_max_level(log::LevelFilter::Trace);
        log::set_boxed_logger(Box::new(self))
    }
}

impl log::Log for ChannelLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let level = match record.level() {
            log::Level::Trace => LogLevel::Trace,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Info => LogLevel::Info,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Error => LogLevel::Error,
        };
        self.context.log_f(self.channel, level, *record.args());
    }

    fn flush(&self) {}
}

/// Channel logging with the compile-time floor applied at the call site.
#[macro_export]
macro_rules! log_channel {
    ($ctx:expr, $id:expr, $level:expr, $($arg:tt)*) => {{
        if $crate::logging::level_enabled($level) {
            $ctx.log_f($id, $level, format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $id:expr, $($arg:tt)*) => {
        $crate::log_channel!($ctx, $id, $crate::logging::LogLevel::Trace, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $id:expr, $($arg:tt)*) => {
        $crate::log_channel!($ctx, $id, $crate::logging::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $id:expr, $($arg:tt)*) => {
        $crate::log_channel!($ctx, $id, $crate::logging::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $id:expr, $($arg:tt)*) => {
        $crate::log_channel!($ctx, $id, $crate::logging::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $id:expr, $($arg:tt)*) => {
        $crate::log_channel!($ctx, $id, $crate::logging::LogLevel::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_fatal {
    ($ctx:expr, $id:expr, $($arg:tt)*) => {
        $crate::log_channel!($ctx, $id, $crate::logging::LogLevel::Fatal, $($arg)*)
    };
}
