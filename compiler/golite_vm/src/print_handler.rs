//! Print handler for configurable output.
//!
//! Output from `print` and `println` goes to one of:
//! - stdout (default)
//! - a buffer, for tests and hosts that capture output
//! - nowhere
//! - an arbitrary writer supplied by the host

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Destination of script output.
///
/// Enum dispatch keeps the common stdout and buffer paths free of vtable
/// calls.
pub enum PrintHandler {
    /// Writes to stdout.
    Stdout,
    /// Captures output for later retrieval.
    Buffer(Mutex<String>),
    /// Discards all output.
    Silent,
    /// Writes to a host-supplied sink. Write failures are ignored.
    Writer(Mutex<Box<dyn Write + Send>>),
}

impl PrintHandler {
    /// Write `msg` without a trailing newline.
    pub fn print(&self, msg: &str) {
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(msg.as_bytes());
                let _ = out.flush();
            }
            Self::Buffer(buf) => buf.lock().push_str(msg),
            Self::Silent => {}
            Self::Writer(w) => {
                let mut w = w.lock();
                let _ = w.write_all(msg.as_bytes());
                let _ = w.flush();
            }
        }
    }

    /// Write `msg` followed by a newline.
    pub fn println(&self, msg: &str) {
        match self {
            Self::Stdout => println!("{msg}"),
            Self::Buffer(buf) => {
                let mut buf = buf.lock();
                buf.push_str(msg);
                buf.push('\n');
            }
            Self::Silent => {}
            Self::Writer(w) => {
                let mut w = w.lock();
                let _ = writeln!(w, "{msg}");
                let _ = w.flush();
            }
        }
    }

    /// Captured output; empty for handlers that do not capture.
    pub fn get_output(&self) -> String {
        match self {
            Self::Buffer(buf) => buf.lock().clone(),
            Self::Stdout | Self::Silent | Self::Writer(_) => String::new(),
        }
    }

    /// Discard captured output.
    pub fn clear(&self) {
        if let Self::Buffer(buf) = self {
            buf.lock().clear();
        }
    }
}

impl std::fmt::Debug for PrintHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Stdout => "Stdout",
            Self::Buffer(_) => "Buffer",
            Self::Silent => "Silent",
            Self::Writer(_) => "Writer",
        };
        f.write_str(name)
    }
}

/// Print handler shared between an interpreter and the VMs it creates.
pub type SharedPrintHandler = Arc<PrintHandler>;

pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Stdout)
}

/// A handler capturing output for [`PrintHandler::get_output`].
pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Buffer(Mutex::new(String::new())))
}

pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Silent)
}

/// A handler forwarding output to `writer`.
pub fn writer_handler(writer: impl Write + Send + 'static) -> SharedPrintHandler {
    Arc::new(PrintHandler::Writer(Mutex::new(Box::new(writer))))
}
