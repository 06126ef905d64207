use std::path::PathBuf;
use std::sync::Arc;

use crate::{observer::TerminalObserver, print_success, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Testlib-compatible checker source, called as `checker <input> <output> <answer>`
    #[arg(required_unless_present = "unset")]
    pub checker: Option<PathBuf>,

    /// Go back to plain output comparison
    #[arg(long, conflicts_with = "checker")]
    pub unset: bool,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    super::load_problem(&session, &program_file)?;

    let checker = match &args.checker {
        Some(path) if !args.unset => Some(util::program_file(path)?),
        _ => None,
    };
    anyhow::ensure!(session.set_checker(checker.clone()), "Failed to set checker");

    match checker {
        Some(path) => print_success!("Checker set to {}", path.to_string_lossy()),
        None => print_success!("{}", "Checker removed"),
    }
    Ok(())
}
