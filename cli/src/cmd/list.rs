use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize as _;
use cpjudge_core::{IoValue, Problem};

use crate::{observer::TerminalObserver, style, util};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub program_file: PathBuf,

    /// Print input, answer and output of every case
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let program_file = util::program_file(&args.program_file)?;
    let session = global_args.open_session(Arc::new(TerminalObserver::new()))?;
    let problem = super::load_problem(&session, &program_file)?;

    print_header(&problem);
    for (i, (_, tc)) in problem.iter_ordered().enumerate() {
        if args.verbose && tc.result.is_some() {
            style::print_test_result_detail(i + 1, tc);
            continue;
        }
        let verdict = match &tc.result {
            Some(r) => format!(
                "{}{}",
                style::padded_judge_icon(r.verdict),
                r.elapsed_ms
                    .map(|ms| format!(" [{}ms]", ms))
                    .unwrap_or_default()
            ),
            None => "  -  ".dimmed().to_string(),
        };
        let disabled = if tc.disabled {
            " (disabled)".bright_black().to_string()
        } else {
            String::new()
        };
        println!(
            "#{:<3} {} {}{}",
            i + 1,
            verdict,
            preview(&tc.stdin).bright_black(),
            disabled
        );
    }
    Ok(())
}

fn print_header(p: &Problem) {
    println!("{}", p.name.bold());
    if let Some(url) = &p.url {
        println!("  {}", url);
    }
    println!(
        "  {}ms, {}MB, {} test case(s)",
        p.time_limit_ms,
        p.memory_limit_mb,
        p.len()
    );
    if let Some(checker) = &p.checker {
        println!(
            "  checker: {}",
            util::replace_homedir_to_tilde(&checker.path).display()
        );
    }
    if let Some(interactor) = &p.interactor {
        println!(
            "  interactor: {}",
            util::replace_homedir_to_tilde(&interactor.path).display()
        );
    }
}

/// First line of the input, or the file name for file-backed input.
fn preview(v: &IoValue) -> String {
    const MAX: usize = 40;
    if v.is_empty_inline() {
        return "<empty>".into();
    }
    match v {
        IoValue::File(path) => format!("<{}>", util::replace_homedir_to_tilde(path).display()),
        IoValue::Inline(s) => {
            let line = s.lines().next().unwrap_or_default();
            let mut res: String = line.chars().take(MAX).collect();
            if line.chars().count() > MAX || s.lines().nth(1).is_some() {
                res.push_str(" …");
            }
            res
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn preview_shows_first_line() {
        assert_eq!(preview(&"1 2\n".into()), "1 2");
        assert_eq!(preview(&"3\n1 2 3\n".into()), "3 …");
        assert_eq!(preview(&"".into()), "<empty>");
        assert_eq!(preview(&"\n".into()), "");
        assert_eq!(preview(&"x".repeat(50).into()), format!("{} …", "x".repeat(40)));
    }
}
