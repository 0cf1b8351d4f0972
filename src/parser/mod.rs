pub mod labels;
pub mod product;
pub mod search;

use scraper::{ElementRef, Selector};

use crate::record::RawRecord;

pub use labels::{LabelRule, LabelRules};
pub use product::ProductParser;
pub use search::first_result_link;

/// Page regions the product parser looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Picture,
    Description,
    Title,
    Categories,
    BioTable,
}

/// A parsed product page plus the regions that were not on it.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub record: RawRecord,
    pub missing: Vec<Region>,
}

/// Static selectors only; a bad literal is a programming error.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Trimmed text nodes of `el`, empty ones dropped, joined by `sep`.
pub(crate) fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
