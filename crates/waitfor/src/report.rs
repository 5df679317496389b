//! Progress reporting for verbose runs.

use std::io::Write;
use std::time::Duration;

/// A readiness transition of one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Up { target: String, elapsed: Duration },
    Down { target: String, reason: String },
}

impl ProbeEvent {
    pub fn target(&self) -> &str {
        match self {
            ProbeEvent::Up { target, .. } | ProbeEvent::Down { target, .. } => target,
        }
    }

    /// Render the event as a progress line, padding the target to `width`
    pub fn format(&self, width: usize) -> String {
        match self {
            ProbeEvent::Up { target, elapsed } => {
                format!("> up:   {target:<width$} (after {elapsed:?})")
            }
            ProbeEvent::Down { target, reason } => {
                format!("> down: {target:<width$} -- {reason}")
            }
        }
    }
}

/// Receives progress events; called concurrently from every probe task
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &ProbeEvent);
}

/// Prints progress lines to stdout
#[derive(Debug, Clone)]
pub struct StdoutObserver {
    width: usize,
}

impl StdoutObserver {
    /// Padding is sized once from the longest target name
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let width = targets.into_iter().map(|t| t.as_ref().len()).max().unwrap_or_default();
        Self { width }
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl Observer for StdoutObserver {
    fn on_event(&self, event: &ProbeEvent) {
        let line = event.format(self.width);
        // one locked write per line
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
    }
}
