use std::path::PathBuf;
use std::sync::Arc;

use crate::{observer::TerminalObserver, print_success, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Test case numbers; all cases when omitted
    #[arg(short, long, num_args = 1..)]
    pub case: Vec<usize>,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    let problem = super::load_problem(&session, &program_file)?;

    if args.case.is_empty() {
        anyhow::ensure!(session.clear_all_results(), "Failed to clear results");
        print_success!("Cleared results of {} test case(s)", problem.len());
        return Ok(());
    }

    let ids = util::case_ids(&problem, &args.case)?;
    for &id in &ids {
        session.clear_result(id);
    }
    print_success!("Cleared results of {} test case(s)", ids.len());
    Ok(())
}
