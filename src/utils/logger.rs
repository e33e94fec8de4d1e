use chrono::Local;
use std::fmt::{self, Arguments};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO ",
            Level::Warn => "WARN ",
            Level::Error => "ERROR",
        };
        write!(f, "{str}")
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

pub struct Logger;

impl Logger {
    /// Sets the lowest level that still gets printed. Called once from `main`.
    pub fn set_level(level: Level) {
        MIN_LEVEL.store(level as u8, Ordering::Relaxed);
    }

    pub fn enabled(level: Level) -> bool {
        level as u8 >= MIN_LEVEL.load(Ordering::Relaxed)
    }

    pub fn log(level: Level, args: Arguments) {
        if !Logger::enabled(level) {
            return;
        }

        let local = Local::now().format("%d/%m/%Y %H:%M:%S");
        match level {
            Level::Debug | Level::Info => println!("[{level}] [{local}] {args}"),
            Level::Warn | Level::Error => eprintln!("[{level}] [{local}] {args}"),
        }
    }
}

#[macro_export]
macro_rules! logger {
    (INFO, $($arg:tt)*) => {
        $crate::utils::logger::Logger::log($crate::utils::logger::Level::Info, format_args!($($arg)*))
    };
    (DEBUG, $($arg:tt)*) => {
        $crate::utils::logger::Logger::log($crate::utils::logger::Level::Debug, format_args!($($arg)*))
    };
    (WARN, $($arg:tt)*) => {
        $crate::utils::logger::Logger::log($crate::utils::logger::Level::Warn, format_args!($($arg)*))
    };
    (ERROR, $($arg:tt)*) => {
        $crate::utils::logger::Logger::log($crate::utils::logger::Level::Error, format_args!($($arg)*))
    };
}
