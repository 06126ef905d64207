use serde::Deserialize;

use crate::verdict::Verdict;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareOptions {
    /// When off, anything written to stderr makes the run RE.
    pub ignore_stderr: bool,
    /// Output at least `answer length * ole_ratio` bytes long is OLE. Lengths are taken before any trimming.
    pub ole_ratio: Option<f64>,
    pub regard_pe_as_ac: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            ignore_stderr: true,
            ole_ratio: None,
            regard_pe_as_ac: false,
        }
    }
}

/// Trailing whitespace removed from every line and from the whole text.
fn line_trimmed(s: &str) -> String {
    s.trim_end()
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

fn without_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Judges `stdout` against `answer`. Checks run in a fixed order and the first hit wins:
/// RE (stderr), OLE, WA (tokens differ), PE (only whitespace differs), AC.
pub fn compare(stdout: &str, answer: &str, stderr: &str, opts: &CompareOptions) -> Verdict {
    if !opts.ignore_stderr && !stderr.is_empty() {
        return Verdict::RE;
    }

    if let Some(ratio) = opts.ole_ratio.filter(|&r| r > 0.0) {
        if stdout.len() as f64 >= answer.len() as f64 * ratio {
            return Verdict::OLE;
        }
    }

    if without_whitespace(stdout) != without_whitespace(answer) {
        return Verdict::WA;
    }
    if line_trimmed(stdout) != line_trimmed(answer) && !opts.regard_pe_as_ac {
        return Verdict::PE;
    }
    Verdict::AC
}

#[cfg(test)]
mod test {
    use super::*;

    struct X {
        stdout: &'static str,
        answer: &'static str,
        stderr: &'static str,
        opts: CompareOptions,
        want: Verdict,
    }

    fn run_test(x: X) {
        let got = compare(x.stdout, x.answer, x.stderr, &x.opts);
        assert_eq!(
            got, x.want,
            "stdout={:?} answer={:?} stderr={:?}",
            x.stdout, x.answer, x.stderr
        );
    }

    fn strict() -> CompareOptions {
        CompareOptions {
            ignore_stderr: false,
            ..Default::default()
        }
    }

    #[test]
    fn should_be_ac() {
        run_test(X {
            stdout: "hello_123\n",
            answer: "hello_123\n",
            stderr: "",
            opts: strict(),
            want: Verdict::AC,
        });
    }

    #[test]
    fn should_be_ac_with_trailing_whitespace_and_crlf() {
        run_test(X {
            stdout: "1 2  \r\n3\r\n\n\n",
            answer: "1 2\n3",
            stderr: "",
            opts: strict(),
            want: Verdict::AC,
        });
    }

    #[test]
    fn should_be_pe_when_only_inner_whitespace_differs() {
        run_test(X {
            stdout: "1 2\n3\n",
            answer: "1\n2 3\n",
            stderr: "",
            opts: strict(),
            want: Verdict::PE,
        });
    }

    #[test]
    fn pe_is_ac_if_configured() {
        run_test(X {
            stdout: "1  2",
            answer: "1 2",
            stderr: "",
            opts: CompareOptions {
                regard_pe_as_ac: true,
                ..strict()
            },
            want: Verdict::AC,
        });
    }

    #[test]
    fn should_be_wa() {
        run_test(X {
            stdout: "12\n",
            answer: "1 3\n",
            stderr: "",
            opts: strict(),
            want: Verdict::WA,
        });
    }

    #[test]
    fn stderr_wins_over_everything() {
        run_test(X {
            stdout: "totally wrong",
            answer: "42",
            stderr: "debug",
            opts: CompareOptions {
                ole_ratio: Some(1.0),
                ..strict()
            },
            want: Verdict::RE,
        });
    }

    #[test]
    fn stderr_is_ignored_if_configured() {
        run_test(X {
            stdout: "42",
            answer: "42",
            stderr: "debug",
            opts: CompareOptions::default(),
            want: Verdict::AC,
        });
    }

    #[test]
    fn ole_wins_over_wa() {
        run_test(X {
            stdout: "1111111111",
            answer: "22",
            stderr: "",
            opts: CompareOptions {
                ole_ratio: Some(2.0),
                ..strict()
            },
            want: Verdict::OLE,
        });
    }

    fn ole_at(stdout: &'static str, answer: &'static str, ratio: f64, want: Verdict) {
        run_test(X {
            stdout,
            answer,
            stderr: "",
            opts: CompareOptions {
                ole_ratio: Some(ratio),
                ..strict()
            },
            want,
        });
    }

    #[test]
    fn ole_boundary_is_inclusive() {
        ole_at("ab", "a", 2.0, Verdict::OLE);
        ole_at("1 2 3", "1 2", 1.0, Verdict::OLE);
        ole_at("12345", "12345", 1.0, Verdict::OLE);
        ole_at("a", "ab", 1.0, Verdict::WA);
        ole_at("12345", "12345", 1.5, Verdict::AC);
    }

    #[test]
    fn ole_counts_untrimmed_bytes() {
        ole_at("1 2  \n", "1 2", 1.0, Verdict::OLE);
        ole_at("1 2  \n", "1 2", 2.0, Verdict::AC);
        ole_at("1 2", "1 2\n\n\n", 1.0, Verdict::AC);
    }

    #[test]
    fn empty_answer_is_ole_once_a_ratio_is_set() {
        ole_at("", "", 2.0, Verdict::OLE);
        run_test(X {
            stdout: "\n",
            answer: "",
            stderr: "",
            opts: strict(),
            want: Verdict::AC,
        });
    }

    #[test]
    fn zero_ratio_disables_ole() {
        ole_at("1111111111", "1", 0.0, Verdict::WA);
    }
}
