use std::path::PathBuf;
use std::sync::Arc;

use cpjudge_core::judge::{CaseEdit, CaseField};
use cpjudge_core::IoValue;

use crate::{observer::TerminalObserver, print_success, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ArgField {
    Input,
    Answer,
}

impl From<ArgField> for CaseField {
    fn from(value: ArgField) -> Self {
        match value {
            ArgField::Input => CaseField::Stdin,
            ArgField::Answer => CaseField::Answer,
        }
    }
}

/// Edits a single test case.
#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Test case number as shown by `list`
    pub number: usize,

    #[arg(short, long)]
    pub input: Option<String>,

    #[arg(short, long)]
    pub answer: Option<String>,

    /// Enable or disable the case in `run`
    #[arg(long)]
    pub toggle_disable: bool,

    #[arg(long)]
    pub toggle_expand: bool,

    /// Move inline data into a file next to the program, or back
    #[arg(long, value_enum)]
    pub toggle_storage: Option<ArgField>,

    /// New position of the case
    #[arg(short, long)]
    pub move_to: Option<usize>,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    let problem = super::load_problem(&session, &program_file)?;
    let id = util::case_ids(&problem, &[args.number])?[0];

    if args.input.is_some() || args.answer.is_some() {
        let edit = CaseEdit {
            stdin: args.input.as_deref().map(IoValue::from),
            answer: args.answer.as_deref().map(IoValue::from),
        };
        anyhow::ensure!(session.update_case(id, edit), "Failed to update test case");
    }
    if args.toggle_disable {
        session.toggle_disable(id);
    }
    if args.toggle_expand {
        session.toggle_expand(id);
    }
    if let Some(field) = args.toggle_storage {
        session.toggle_case_storage(id, field.into()).await?;
    }
    if let Some(to) = args.move_to {
        anyhow::ensure!(to > 0, "Test case numbers start at 1");
        let from = args.number - 1;
        anyhow::ensure!(session.move_case(from, to - 1), "Failed to move test case");
    }

    print_success!("Updated test case #{}", args.number);
    Ok(())
}
