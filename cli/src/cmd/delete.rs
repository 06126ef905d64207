use std::path::PathBuf;
use std::sync::Arc;

use crate::{observer::TerminalObserver, print_success, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Delete only these test cases instead of the whole problem
    #[arg(short, long, num_args = 1..)]
    pub case: Vec<usize>,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    let problem = super::load_problem(&session, &program_file)?;

    if args.case.is_empty() {
        session.delete_problem()?;
        print_success!("Deleted problem '{}'", problem.name);
        return Ok(());
    }

    // resolve every number before the order changes
    let ids = util::case_ids(&problem, &args.case)?;
    let deleted = ids.iter().filter(|&&id| session.delete_case(id)).count();
    print_success!("Deleted {} test case(s)", deleted);
    Ok(())
}
