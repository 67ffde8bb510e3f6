//! Page duplication planning
//!
//! Decides how many trailing pages of an invoice get extra copies and
//! arranges the output page order. Everything here is pure: no PDF or
//! file access, so the page type is generic.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::layout::PageDimensions;

/// Cap on the duplicate count for the capped rule and the rescale policy
pub const CAPPED_MAX_DUPLICATES: usize = 3;

/// Largest document the capped rule accepts
pub const CAPPED_MAX_PAGES: usize = 11;

/// Rule mapping a page count to the number of trailing pages duplicated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriplicateRule {
    /// 3-5 pages -> 1, 6-8 -> 2, 9-11 -> 3, 12-14 -> 4, ...
    #[default]
    Uncapped,
    /// Same as `Uncapped` but never more than 3, and documents over 11 pages are rejected
    Capped,
}

/// Result of applying a rule to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriplicateSpec {
    pub total_pages: usize,
    pub duplicate_count: usize,
}

impl TriplicateRule {
    /// Number of trailing pages to duplicate
    pub fn count(self, total_pages: usize) -> usize {
        if total_pages < 3 {
            return 0;
        }
        let count = (total_pages - 2).div_ceil(3).min(total_pages);
        match self {
            TriplicateRule::Uncapped => count,
            TriplicateRule::Capped => count.min(CAPPED_MAX_DUPLICATES),
        }
    }

    /// Apply the rule, rejecting documents that have nothing to duplicate
    /// or (capped rule) too many pages.
    pub fn plan(self, total_pages: usize) -> Result<TriplicateSpec> {
        if self == TriplicateRule::Capped && total_pages > CAPPED_MAX_PAGES {
            return Err(Error::TooManyPages {
                pages: total_pages,
                limit: CAPPED_MAX_PAGES,
            });
        }

        let duplicate_count = self.count(total_pages);
        if duplicate_count == 0 {
            return Err(Error::TooFewPages(total_pages));
        }

        Ok(TriplicateSpec {
            total_pages,
            duplicate_count,
        })
    }
}

impl FromStr for TriplicateRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uncapped" => Ok(TriplicateRule::Uncapped),
            "capped" => Ok(TriplicateRule::Capped),
            other => Err(Error::General(format!("Unknown triplicate rule: {}", other))),
        }
    }
}

impl fmt::Display for TriplicateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriplicateRule::Uncapped => write!(f, "uncapped"),
            TriplicateRule::Capped => write!(f, "capped"),
        }
    }
}

/// How the output document is arranged from the source pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyPolicy {
    /// Whole document, then the tail twice more
    #[default]
    FullPlusTwoExtraCopies,
    /// The tail three times, nothing else
    FullPlusThreeTailCopies,
    /// The tail once
    TailOnce,
    /// The tail once, each page scaled onto an A5 sheet
    TailRescaledToFixedSheet,
}

impl AssemblyPolicy {
    /// Rule used when none is configured explicitly
    pub fn default_rule(self) -> TriplicateRule {
        match self {
            AssemblyPolicy::TailRescaledToFixedSheet => TriplicateRule::Capped,
            _ => TriplicateRule::Uncapped,
        }
    }

    /// Sheet every output page is rescaled onto, if any
    pub fn target_sheet(self) -> Option<PageDimensions> {
        match self {
            AssemblyPolicy::TailRescaledToFixedSheet => Some(PageDimensions::a5()),
            _ => None,
        }
    }
}

impl FromStr for AssemblyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full-plus-two-extra-copies" | "full" => Ok(AssemblyPolicy::FullPlusTwoExtraCopies),
            "full-plus-three-tail-copies" | "tail-x3" => Ok(AssemblyPolicy::FullPlusThreeTailCopies),
            "tail-once" | "tail" => Ok(AssemblyPolicy::TailOnce),
            "tail-rescaled" | "a5" => Ok(AssemblyPolicy::TailRescaledToFixedSheet),
            other => Err(Error::General(format!("Unknown assembly policy: {}", other))),
        }
    }
}

impl fmt::Display for AssemblyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssemblyPolicy::FullPlusTwoExtraCopies => "full-plus-two-extra-copies",
            AssemblyPolicy::FullPlusThreeTailCopies => "full-plus-three-tail-copies",
            AssemblyPolicy::TailOnce => "tail-once",
            AssemblyPolicy::TailRescaledToFixedSheet => "tail-rescaled",
        };
        f.write_str(name)
    }
}

/// Arrange `pages` into the output order for `policy`.
///
/// `duplicate_count` is the tail length, normally from [`TriplicateRule::count`].
/// A zero count is an error, never an empty document. Rescaling itself is
/// left to the caller; this only selects and orders pages.
///
/// # Example
///
/// ```
/// use invoice_triplicate::plan::{assemble, AssemblyPolicy};
///
/// let pages = vec![0, 1, 2, 3, 4];
/// let out = assemble(&pages, 1, AssemblyPolicy::FullPlusTwoExtraCopies).unwrap();
/// assert_eq!(out, vec![0, 1, 2, 3, 4, 4, 4]);
/// ```
pub fn assemble<T: Clone>(pages: &[T], duplicate_count: usize, policy: AssemblyPolicy) -> Result<Vec<T>> {
    let total = pages.len();

    if duplicate_count == 0 {
        return Err(Error::NoDuplicatePages);
    }
    if duplicate_count > total {
        return Err(Error::General(format!(
            "Cannot duplicate {} pages of a {} page document",
            duplicate_count, total
        )));
    }

    let duplicate_count = if policy == AssemblyPolicy::TailRescaledToFixedSheet {
        if total > CAPPED_MAX_PAGES {
            return Err(Error::TooManyPages {
                pages: total,
                limit: CAPPED_MAX_PAGES,
            });
        }
        duplicate_count.min(CAPPED_MAX_DUPLICATES)
    } else {
        duplicate_count
    };

    let tail = &pages[total - duplicate_count..];

    let output = match policy {
        AssemblyPolicy::FullPlusTwoExtraCopies => {
            let mut out = Vec::with_capacity(total + 2 * tail.len());
            out.extend_from_slice(pages);
            for _ in 0..2 {
                out.extend_from_slice(tail);
            }
            out
        }
        AssemblyPolicy::FullPlusThreeTailCopies => {
            let mut out = Vec::with_capacity(3 * tail.len());
            for _ in 0..3 {
                out.extend_from_slice(tail);
            }
            out
        }
        AssemblyPolicy::TailOnce | AssemblyPolicy::TailRescaledToFixedSheet => tail.to_vec(),
    };

    Ok(output)
}
