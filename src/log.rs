use std::env;
use std::sync::LazyLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
}

impl Level {
    fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "warn" | "warning" => Self::Warn,
            "info" => Self::Info,
            _ => Self::Error,
        }
    }
}

static CHESS_POSITIONS_LOG: LazyLock<Level> = LazyLock::new(|| {
    env::var("CHESS_POSITIONS_LOG")
        .map(|s| Level::from_str(&s))
        .unwrap_or(Level::Error)
});

macro_rules! log {
    ($level:expr, $prefix:expr, $msg:expr) => {
        if *CHESS_POSITIONS_LOG >= $level {
            eprintln!(concat!("chess_positions ", $prefix, ": {}"), $msg.as_ref());
        }
    };
}

pub fn error(msg: impl AsRef<str>) {
    log!(Level::Error, "ERROR", msg);
}

pub fn warn(msg: impl AsRef<str>) {
    log!(Level::Warn, "WARN", msg);
}

pub fn info(msg: impl AsRef<str>) {
    log!(Level::Info, "INFO", msg);
}
