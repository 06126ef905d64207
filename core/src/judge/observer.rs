use log::Level;

use crate::problem::Problem;

/// Receives every state change of a [`Session`](super::Session).
///
/// Callbacks run synchronously, in order, while the session holds its problem lock:
/// implementations must not call back into the session.
pub trait Observer: Send + Sync {
    /// `None` when the problem was closed or deleted.
    fn on_problem_change(&self, problem: Option<&Problem>);

    fn on_compile_output(&self, output: &str) {
        log::info!("Compiler output:\n{}", output);
    }

    fn notify(&self, level: Level, msg: &str) {
        log::log!(level, "{}", msg);
    }
}

/// Logs notifications and ignores problem updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_problem_change(&self, problem: Option<&Problem>) {
        match problem {
            Some(p) => log::trace!("Problem '{}' changed", p.name),
            None => log::trace!("Problem closed"),
        }
    }
}
