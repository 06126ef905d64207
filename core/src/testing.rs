pub mod checker;
pub mod compare;
pub mod compiler;
pub mod interactor;
pub mod runner;

pub use checker::{Checker, CheckerVerdict};
pub use compare::{compare, CompareOptions};
pub use compiler::{CompileOutcome, Compiler, Recompile};
pub use interactor::{InteractiveOutcome, Interactor};
pub use runner::{ExecTarget, ProcessRunner, RunOutcome};
