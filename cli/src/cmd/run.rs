use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize as _;
use cpjudge_core::testing::Recompile;
use cpjudge_core::{StopMode, Verdict};

use crate::{observer::TerminalObserver, style, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Run only test case #N
    #[arg(short, long)]
    pub case: Option<usize>,

    /// Recompile even if the cached binary is up to date
    #[arg(short, long, conflicts_with = "no_compile")]
    pub force: bool,

    /// Never compile; fail if there is no cached binary
    #[arg(long)]
    pub no_compile: bool,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::with_progress()))?;
    let problem = super::load_problem(&session, &program_file)?;

    let recompile = match (args.force, args.no_compile) {
        (true, _) => Recompile::Always,
        (_, true) => Recompile::Never,
        _ => Recompile::Auto,
    };
    let only = match args.case {
        Some(n) => Some(util::case_ids(&problem, &[n])?[0]),
        None => None,
    };

    log::info!("Running {}", program_file.display());
    let run = async {
        match only {
            Some(id) => session.run_one(id, recompile).await,
            None => session.run_all(recompile).await,
        }
    };
    tokio::pin!(run);

    let interrupted = tokio::select! {
        _ = &mut run => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        eprintln!("{}", "Stopping...".bright_yellow());
        session.stop(StopMode::All);
        run.await;
    }
    println!();

    let Some(problem) = session.problem() else {
        return Ok(());
    };
    let ran: Vec<_> = problem
        .iter_ordered()
        .enumerate()
        .filter(|(_, (id, tc))| {
            only.map_or(!tc.disabled, |only| only == *id) && tc.result.is_some()
        })
        .collect();

    for (i, (_, tc)) in &ran {
        if tc.expanded && !tc.verdict().map_or(false, Verdict::is_accepted) {
            style::print_test_result_detail(i + 1, tc);
        }
    }

    let verdicts: Vec<Verdict> = ran.iter().filter_map(|(_, (_, tc))| tc.verdict()).collect();
    if !verdicts.is_empty() {
        style::print_test_result_summary(&verdicts);
    }
    Ok(())
}
