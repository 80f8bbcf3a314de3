//! Catalog assembly state machine.
//!
//! ```text
//! Init -> BackgroundDiscovery -> [CoverPage] -> [IntroPage] -> PageCopyLoop -> Finalize -> Done
//!                                         any error -> Failed
//! ```

use super::color::ColorSampler;
use super::overlay::ImageOverlayPlacer;
use super::rewriter::PriceRewriter;
use crate::backend::{CatalogBackend, CatalogPage, SaveMode};
use crate::domain::{BrandImage, CatalogPlan, Point, Rect, Rgb};
use crate::error::{CatalogError, CatalogResult};
use chrono::{Local, NaiveDate};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Share of the progress range used by the page loop; the rest covers saving.
pub const PAGE_LOOP_SHARE: f32 = 0.9;
pub const SAVE_PROGRESS: f32 = 0.95;

/// Cover logo side as a fraction of the page width.
pub const COVER_LOGO_SCALE: f32 = 0.5;
/// How far above the page center the cover logo sits.
pub const COVER_LOGO_LIFT: f32 = 50.0;

pub const TITLE_FONT_SIZE: f32 = 30.0;
pub const TITLE_BASELINE: f32 = 300.0;
pub const DATE_FONT_SIZE: f32 = 18.0;
pub const DATE_BASELINE: f32 = 350.0;
pub const DATE_LABEL: &str = "Gerado em";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStage {
    Init,
    BackgroundDiscovery,
    CoverPage,
    IntroPage,
    PageCopyLoop,
    Finalize,
    Done,
    Failed,
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "initialization",
            Self::BackgroundDiscovery => "background discovery",
            Self::CoverPage => "cover page",
            Self::IntroPage => "intro page",
            Self::PageCopyLoop => "page processing",
            Self::Finalize => "finalization",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counts returned by a successful catalog run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogReport {
    pub prices_updated: usize,
    pub logos_inserted: usize,
    pub pages_written: usize,
    pub pages_excluded: usize,
}

impl fmt::Display for CatalogReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Catalog generated: {} prices updated, {} logos inserted, {} pages written",
            self.prices_updated, self.logos_inserted, self.pages_written
        )
    }
}

/// Builds the output catalog from a source document and a plan.
pub struct CatalogAssembler<'a> {
    plan: &'a CatalogPlan,
    logo: Option<&'a BrandImage>,
    generated_on: NaiveDate,
    stage: AssemblyStage,
}

impl<'a> CatalogAssembler<'a> {
    pub fn new(plan: &'a CatalogPlan, logo: Option<&'a BrandImage>) -> Self {
        Self {
            plan,
            logo,
            generated_on: Local::now().date_naive(),
            stage: AssemblyStage::Init,
        }
    }

    /// Overrides the date printed on the intro page.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.generated_on = date;
        self
    }

    pub fn stage(&self) -> AssemblyStage {
        self.stage
    }

    /// Runs the whole pipeline and writes the result to `dest`.
    ///
    /// `progress` receives values in `0.0..=1.0`. Any error moves the
    /// assembler to [`AssemblyStage::Failed`] and is reported as a
    /// [`CatalogError::PipelineFatal`] naming the stage it happened in,
    /// unless it is already an open or save failure.
    pub fn assemble<B, F>(&mut self, backend: B, dest: &Path, mut progress: F) -> CatalogResult<CatalogReport>
    where
        B: CatalogBackend,
        F: FnMut(f32),
    {
        match self.run(backend, dest, &mut progress) {
            Ok(report) => {
                self.transition(AssemblyStage::Done);
                info!("{}", report);
                Ok(report)
            }
            Err(e) => {
                let stage = self.stage;
                self.stage = AssemblyStage::Failed;
                error!(stage = %stage, error = %e, "Catalog assembly failed");
                Err(CatalogError::fatal(stage.to_string(), e))
            }
        }
    }

    fn run<B: CatalogBackend>(
        &mut self,
        mut backend: B,
        dest: &Path,
        progress: &mut dyn FnMut(f32),
    ) -> CatalogResult<CatalogReport> {
        self.stage = AssemblyStage::Init;
        let total = backend.page_count();
        let mut report = CatalogReport::default();
        debug!(pages = total, dest = %dest.display(), "Starting catalog assembly");

        self.transition(AssemblyStage::BackgroundDiscovery);
        let background = self.discover_background(&backend)?;
        let foreground = ColorSampler::contrast_of(background);

        if self.plan.wants_cover() {
            match self.logo {
                Some(logo) => {
                    self.transition(AssemblyStage::CoverPage);
                    let page = self.cover_page(&mut backend, logo, background)?;
                    backend.append_page(page)?;
                }
                None => warn!("Brand image could not be loaded, skipping cover page"),
            }
        } else if self.plan.add_cover_page {
            warn!("Cover page requested without a logo, skipping");
        }

        if self.plan.add_intro_page {
            self.transition(AssemblyStage::IntroPage);
            let page = self.intro_page(&mut backend, background, foreground)?;
            backend.append_page(page)?;
        }

        self.transition(AssemblyStage::PageCopyLoop);
        let rewriter = PriceRewriter::new(self.plan.price_markup);
        let placer = self.logo.map(ImageOverlayPlacer::new);

        for index in 0..total {
            if self.plan.is_excluded(index) {
                debug!(page = index, "Page excluded");
                report.pages_excluded += 1;
            } else {
                let mut page = backend.load_page(index)?;
                let prices = rewriter.rewrite_page(&mut page);
                let logos = placer.map_or(0, |p| p.place(&mut page));
                backend.append_page(page)?;

                debug!(page = index, prices, logos, "Page processed");
                report.prices_updated += prices;
                report.logos_inserted += logos;
            }
            progress((index + 1) as f32 / total as f32 * PAGE_LOOP_SHARE);
        }

        self.transition(AssemblyStage::Finalize);
        report.pages_written = backend.output_len();
        progress(SAVE_PROGRESS);
        backend.save(dest, SaveMode::Compact)?;
        progress(1.0);

        Ok(report)
    }

    fn transition(&mut self, next: AssemblyStage) {
        debug!(from = %self.stage, to = %next, "Assembly stage");
        self.stage = next;
    }

    /// Dominant color of the first page that will be kept; white if every
    /// page is excluded.
    fn discover_background<B: CatalogBackend>(&self, backend: &B) -> CatalogResult<Rgb> {
        let first = (0..backend.page_count()).find(|i| !self.plan.is_excluded(*i));
        let background = match first {
            Some(index) => ColorSampler::page_background(&backend.load_page(index)?),
            None => Rgb::WHITE,
        };
        info!(?background, "Discovered page background");
        Ok(background)
    }

    fn cover_page<B: CatalogBackend>(
        &self,
        backend: &mut B,
        logo: &BrandImage,
        background: Rgb,
    ) -> CatalogResult<B::Page> {
        let mut page = backend.new_page()?;
        let bounds = page.bounds();
        page.fill_rect(bounds, background)?;

        let rect = cover_logo_rect(&bounds);
        if let Err(e) = page.insert_image(rect, logo) {
            warn!(error = %e, "Failed to place cover logo");
        }
        Ok(page)
    }

    fn intro_page<B: CatalogBackend>(
        &self,
        backend: &mut B,
        background: Rgb,
        foreground: Rgb,
    ) -> CatalogResult<B::Page> {
        let mut page = backend.new_page()?;
        let bounds = page.bounds();
        page.fill_rect(bounds, background)?;

        let date_line = format!("{}: {}", DATE_LABEL, self.generated_on.format("%d/%m/%Y"));
        let lines = [
            (self.plan.catalog_title.as_str(), TITLE_FONT_SIZE, TITLE_BASELINE),
            (date_line.as_str(), DATE_FONT_SIZE, DATE_BASELINE),
        ];
        for (text, size, baseline) in lines {
            let width = page.text_width(text, size);
            let x = bounds.x0 + (bounds.width() - width) / 2.0;
            page.insert_text(Point::new(x, bounds.y0 + baseline), text, size, foreground)?;
        }
        Ok(page)
    }
}

/// Square logo of half the page width, centered and lifted above center.
pub fn cover_logo_rect(bounds: &Rect) -> Rect {
    let (w, h) = (bounds.width(), bounds.height());
    let side = w * COVER_LOGO_SCALE;
    Rect::new(
        bounds.x0 + (w - side) / 2.0,
        bounds.y0 + (h - side) / 2.0 - COVER_LOGO_LIFT,
        bounds.x0 + (w + side) / 2.0,
        bounds.y0 + (h + side) / 2.0 - COVER_LOGO_LIFT,
    )
}
