//! Price detection on a single page.
//!
//! Fixed-layout documents often split one printed price into unrelated text
//! runs, so four independent scans are layered from strict to permissive:
//!
//! 1. **Span**: text runs that contain a price.
//! 2. **Word adjacency**: a bare symbol token followed by a number token on
//!    the same line.
//! 3. **Line text**: prices in the plain-text lines, located again by search.
//! 4. **Symbol anchor**: every symbol hit, widened to the right to catch a
//!    detached number.
//!
//! The same printed price may be reported by several scans; the rewriter
//! drops the repeats.

use super::occlusion::{ANCHOR_TOLERANCE, DEFAULT_TOLERANCE};
use crate::backend::CatalogPage;
use crate::domain::price::CURRENCY_SYMBOL;
use crate::domain::{
    looks_like_price, AmountMatcher, CurrencyMatcher, NumericFormatter, PatternMatcher, Rect, Rgb,
};
use crate::error::CatalogResult;
use std::fmt;
use tracing::debug;

/// Maximum vertical offset between a symbol token and its number token.
pub const ADJACENCY_TOLERANCE: f32 = 10.0;

/// How far right of a symbol hit the anchor scan looks for digits.
pub const ANCHOR_EXPANSION: f32 = 150.0;

/// Vertical padding of the anchor scan window.
const ANCHOR_PADDING: f32 = 2.0;

/// The scan that produced an occurrence, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Span,
    WordAdjacency,
    LineText,
    SymbolAnchor,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Span,
        Strategy::WordAdjacency,
        Strategy::LineText,
        Strategy::SymbolAnchor,
    ];

    /// Edge tolerance used to recognise an already rewritten region.
    pub fn tolerance(self) -> f32 {
        match self {
            Strategy::SymbolAnchor => ANCHOR_TOLERANCE,
            _ => DEFAULT_TOLERANCE,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Span => "span",
            Strategy::WordAdjacency => "word-adjacency",
            Strategy::LineText => "line-text",
            Strategy::SymbolAnchor => "symbol-anchor",
        };
        f.write_str(name)
    }
}

/// Style declared by the layout engine for the matched text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleHint {
    pub font_size: f32,
    pub color: Option<Rgb>,
}

/// A detected price and where it is printed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceOccurrence {
    pub region: Rect,
    pub raw_text: String,
    /// Parsed amount; zero when the text is not a usable price
    pub parsed_value: f64,
    pub style: Option<StyleHint>,
    pub strategy: Strategy,
}

impl PriceOccurrence {
    pub fn new(region: Rect, raw_text: impl Into<String>, strategy: Strategy) -> Self {
        let raw_text = raw_text.into();
        Self {
            region,
            parsed_value: NumericFormatter::parse(&raw_text),
            raw_text,
            style: None,
            strategy,
        }
    }

    pub fn with_style(mut self, style: StyleHint) -> Self {
        self.style = Some(style);
        self
    }

    /// True when the text parsed into a positive amount.
    pub fn is_price(&self) -> bool {
        self.parsed_value > 0.0
    }
}

/// Runs the detection scans over a page.
#[derive(Debug, Clone, Default)]
pub struct PriceLocator {
    currency: CurrencyMatcher,
    amount: AmountMatcher,
}

impl PriceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs all scans in order and concatenates their raw results.
    pub fn locate<P: CatalogPage + ?Sized>(&self, page: &P) -> CatalogResult<Vec<PriceOccurrence>> {
        let mut found = Vec::new();
        for strategy in Strategy::ALL {
            found.extend(self.scan(page, strategy)?);
        }
        Ok(found)
    }

    /// Runs a single scan.
    pub fn scan<P: CatalogPage + ?Sized>(
        &self,
        page: &P,
        strategy: Strategy,
    ) -> CatalogResult<Vec<PriceOccurrence>> {
        let found = match strategy {
            Strategy::Span => self.span_scan(page)?,
            Strategy::WordAdjacency => self.word_adjacency_scan(page)?,
            Strategy::LineText => self.line_text_scan(page)?,
            Strategy::SymbolAnchor => self.symbol_anchor_scan(page)?,
        };
        debug!(strategy = %strategy, hits = found.len(), "Price scan finished");
        Ok(found)
    }

    /// Text runs that carry the symbol or look like a price.
    ///
    /// The region is narrowed to the matched characters when the backend
    /// reports glyph boxes, so labels sharing the run are left intact.
    pub fn span_scan<P: CatalogPage + ?Sized>(&self, page: &P) -> CatalogResult<Vec<PriceOccurrence>> {
        let mut found = Vec::new();
        for run in page.text_runs()? {
            if !CurrencyMatcher::has_symbol(&run.text) && !looks_like_price(&run.text) {
                continue;
            }
            if let Some(m) = self.currency.pattern().find(&run.text) {
                let region = run.range_bbox(m.range());
                found.push(
                    PriceOccurrence::new(region, m.as_str(), Strategy::Span).with_style(StyleHint {
                        font_size: run.font_size,
                        color: run.color.map(|c| c.to_rgb()),
                    }),
                );
            }
        }
        Ok(found)
    }

    /// A bare symbol token directly followed by a number on the same line.
    pub fn word_adjacency_scan<P: CatalogPage + ?Sized>(
        &self,
        page: &P,
    ) -> CatalogResult<Vec<PriceOccurrence>> {
        let words = page.words()?;
        let mut found = Vec::new();
        for pair in words.windows(2) {
            let (symbol, next) = (&pair[0], &pair[1]);
            if !CurrencyMatcher::is_bare_symbol(&symbol.text) {
                continue;
            }
            if (symbol.bbox.y0 - next.bbox.y0).abs() >= ADJACENCY_TOLERANCE {
                continue;
            }
            let Some(number) = self.amount.find(&next.text) else {
                continue;
            };
            let region = Rect::new(
                symbol.bbox.x0,
                symbol.bbox.y0.min(next.bbox.y0),
                next.bbox.x1,
                symbol.bbox.y1.max(next.bbox.y1),
            );
            found.push(PriceOccurrence::new(
                region,
                format!("{} {}", CURRENCY_SYMBOL, number),
                Strategy::WordAdjacency,
            ));
        }
        Ok(found)
    }

    /// Prices in plain-text lines, mapped back to every rectangle where the
    /// matched text appears.
    pub fn line_text_scan<P: CatalogPage + ?Sized>(
        &self,
        page: &P,
    ) -> CatalogResult<Vec<PriceOccurrence>> {
        let text = page.text(None)?;
        let mut found = Vec::new();
        for line in text.lines().filter(|l| CurrencyMatcher::has_symbol(l)) {
            let mut seen: Vec<&str> = Vec::new();
            for matched in self.currency.extract_all(line) {
                if seen.contains(&matched) {
                    continue;
                }
                seen.push(matched);
                for rect in page.search(matched)? {
                    found.push(PriceOccurrence::new(rect, matched, Strategy::LineText));
                }
            }
        }
        Ok(found)
    }

    /// Widens every symbol hit to the right, reads the text there and
    /// locates the exact price it contains.
    pub fn symbol_anchor_scan<P: CatalogPage + ?Sized>(
        &self,
        page: &P,
    ) -> CatalogResult<Vec<PriceOccurrence>> {
        let mut found = Vec::new();
        for hit in page.search(CURRENCY_SYMBOL)? {
            let window = Rect::new(
                hit.x0,
                hit.y0 - ANCHOR_PADDING,
                hit.x0 + ANCHOR_EXPANSION,
                hit.y1 + ANCHOR_PADDING,
            );
            let text = page.text(Some(window))?;
            let Some(matched) = self.currency.find(text.trim()) else {
                continue;
            };
            for rect in page.search(matched)? {
                found.push(PriceOccurrence::new(rect, matched, Strategy::SymbolAnchor));
            }
        }
        Ok(found)
    }
}
