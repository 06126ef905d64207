use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Classification of a single test case run.
///
/// The transient variants (`WT` .. `CMP`) describe where a case currently is in the
/// pipeline; every other variant is a final verdict.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Verdict {
    UKE,
    AC,
    PC,
    PE,
    WA,
    TLE,
    MLE,
    OLE,
    RE,
    RF,
    CE,
    SE,
    WT,
    FC,
    CP,
    CPD,
    JG,
    JGD,
    CMP,
    SK,
    RJ,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictInfo {
    pub code: &'static str,
    pub name: &'static str,
    /// `#rrggbb`
    pub color: &'static str,
}

impl Verdict {
    pub const fn info(self) -> VerdictInfo {
        use Verdict::*;
        let (code, name, color) = match self {
            UKE => ("UKE", "Unknown Error", "#0000ff"),
            AC => ("AC", "Accepted", "#49cd32"),
            PC => ("PC", "Partially Correct", "#ed9813"),
            PE => ("PE", "Presentation Error", "#ff778e"),
            WA => ("WA", "Wrong Answer", "#d3140d"),
            TLE => ("TLE", "Time Limit Exceed", "#0c0066"),
            MLE => ("MLE", "Memory Limit Exceed", "#5300a7"),
            OLE => ("OLE", "Output Limit Exceed", "#8300a7"),
            RE => ("RE", "Runtime Error", "#1a26c8"),
            RF => ("RF", "Restricted Function", "#008f81"),
            CE => ("CE", "Compilation Error", "#8b7400"),
            SE => ("SE", "System Error", "#000000"),
            WT => ("WT", "Waiting", "#4100d9"),
            FC => ("FC", "Fetched", "#4c00ff"),
            CP => ("CP", "Compiling", "#5e19ff"),
            CPD => ("CPD", "Compiled", "#7340ff"),
            JG => ("JG", "Judging", "#844fff"),
            JGD => ("JGD", "Judged", "#967fff"),
            CMP => ("CMP", "Comparing", "#a87dff"),
            SK => ("SK", "Skipped", "#4b4b4b"),
            RJ => ("RJ", "Rejected", "#4e0000"),
        };
        VerdictInfo { code, name, color }
    }

    pub const fn name(self) -> &'static str {
        self.info().name
    }

    /// The color as an `(r, g, b)` triple.
    pub fn rgb(self) -> (u8, u8, u8) {
        let hex = &self.info().color[1..];
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        (channel(0), channel(2), channel(4))
    }

    pub const fn is_running(self) -> bool {
        use Verdict::*;
        matches!(self, WT | FC | CP | CPD | JG | JGD | CMP)
    }

    pub const fn is_terminal(self) -> bool {
        !self.is_running()
    }

    pub const fn is_accepted(self) -> bool {
        matches!(self, Verdict::AC)
    }

    /// Whether a case finishing with this verdict deserves the user's attention.
    pub const fn should_expand(self) -> bool {
        use Verdict::*;
        !matches!(self, AC | SK | RJ) && !self.is_running()
    }
}
