use std::collections::BTreeMap;

use colored::{Color, ColoredString, Colorize};
use cpjudge_core::problem::TestCase;
use cpjudge_core::Verdict;
use crossterm::terminal;

use crate::util;

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {{
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }};
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                AC => Color::Green,
                PC | PE | WA => Color::Yellow,
                TLE | MLE | OLE => Color::Red,
                RE | RF => Color::Magenta,
                CE | SE | UKE => Color::BrightRed,
                SK | RJ => Color::BrightBlack,
                WT | FC | CP | CPD | JG | JGD | CMP => Color::Blue,
            };
        }
        let (r, g, b) = self.rgb();
        Color::TrueColor { r, g, b }
    }
}

pub fn judge_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightWhite
    };
    format!(" {} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

/// `judge_icon` padded so that icons of different widths line up.
pub fn padded_judge_icon(verdict: Verdict) -> String {
    format!(
        "{}{}",
        judge_icon(verdict),
        " ".repeat(3usize.saturating_sub(verdict.to_string().len()))
    )
}

pub fn print_test_result_summary(verdicts: &[Verdict]) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let count: BTreeMap<String, (Verdict, usize)> =
        verdicts.iter().fold(BTreeMap::new(), |mut count, &v| {
            count.entry(v.to_string()).or_insert((v, 0)).1 += 1;
            count
        });

    let num_total_test = verdicts.len();
    let num_passed = verdicts.iter().filter(|v| v.is_accepted()).count();
    let num_failed = num_total_test - num_passed;

    if num_passed == num_total_test {
        let msg = format!("All {} tests passed ✨", num_total_test);
        print!("{}", msg.green());
    } else {
        let summary_msg = if num_passed > 0 {
            format!("{}/{} tests failed 💣", num_failed, num_total_test)
        } else {
            format!("All {} tests failed 💀", num_total_test)
        };

        let detail_msg = count
            .values()
            .filter(|(v, _)| !v.is_accepted())
            .map(|&(v, cnt)| {
                format!(
                    "{}{}{}",
                    self::judge_icon(v),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    println!(" {}", bar);
}

pub fn print_test_result_detail(number: usize, tc: &TestCase) {
    let Some(res) = &tc.result else {
        return;
    };

    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = cols as usize;

    const BOLD_LINE: &str = "━";
    const THIN_LINE: &str = "─";

    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();
    let elapsed = res
        .elapsed_ms
        .map(|ms| format!(" [{}ms]", ms))
        .unwrap_or_default();

    println!(
        "\n{}: {}{}\n{}",
        format!("Test case #{}", number).bright_yellow().bold(),
        self::judge_icon(res.verdict),
        elapsed,
        bold_bar,
    );

    fn print_sub_title(s: &str, cols: usize) {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE
                .repeat(cols.saturating_sub(s.len() + 1))
                .bright_black(),
        )
    }

    fn print_lines(text: &str) {
        if text.is_empty() {
            println!("{}", "<EMPTY>".magenta().dimmed());
            return;
        }
        for line in text.lines() {
            let trimmed = line.trim_end();
            print!("{}", trimmed);

            let num_trailing_whitespace = line.len() - trimmed.len();
            if num_trailing_whitespace > 0 {
                print!(
                    "{}{}",
                    " ".repeat(num_trailing_whitespace).on_red(),
                    "(Trailing whitespace)".bright_red().bold()
                );
            }
            println!();
        }
    }

    print_sub_title("[input]", cols);
    print_lines(&util::io_text(&tc.stdin));

    print_sub_title("[answer]", cols);
    print_lines(&util::io_text(&tc.answer));

    print_sub_title("[stdout]", cols);
    print_lines(&util::io_text(&res.stdout));

    let stderr = util::io_text(&res.stderr);
    if !stderr.is_empty() {
        print_sub_title("[stderr]", cols);
        println!("{}", stderr);
    }

    if !res.messages.is_empty() {
        print_sub_title("[message]", cols);
        println!("{}", res.message().bright_red());
    }

    println!("{}", bold_bar);
}
