use std::path::PathBuf;
use std::sync::Arc;

use crate::{observer::TerminalObserver, print_success, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Interactor source, called as `interactor <input> <output>` with its stdin and
    /// stdout connected to the program
    #[arg(required_unless_present = "unset")]
    pub interactor: Option<PathBuf>,

    /// Judge by output again
    #[arg(long, conflicts_with = "interactor")]
    pub unset: bool,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    super::load_problem(&session, &program_file)?;

    let interactor = match &args.interactor {
        Some(path) if !args.unset => Some(util::program_file(path)?),
        _ => None,
    };
    anyhow::ensure!(
        session.set_interactor(interactor.clone()),
        "Failed to set interactor"
    );

    match interactor {
        Some(path) => print_success!("Interactor set to {}", path.to_string_lossy()),
        None => print_success!("{}", "Interactor removed"),
    }
    Ok(())
}
