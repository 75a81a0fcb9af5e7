//! Grammar analysis for LL(1) and SLR(1) parsing.
//!
//! A [`Grammar`](grammar::Grammar) is defined once and then analyzed by
//! [`Analysis`](analysis::Analysis), which computes the First/Follow sets,
//! decides whether a predictive (LL(1)) or a shift/reduce (SLR(1)) parser can
//! be built for it, and runs the usable parsers against candidate strings.

pub mod analysis;
pub mod first_follow;
pub mod grammar;
pub mod ll1;
pub mod slr;
pub mod syntax;
pub mod types;
pub mod util;

pub use crate::analysis::{Analysis, ParserKind, Unavailable};

use std::fmt;

/// The outcome of running a parser over a candidate string.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accept => "yes",
            Self::Reject => "no",
        })
    }
}
