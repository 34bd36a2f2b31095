use crate::models::Viewport;

/// Padding reserved around the content area so a full page never touches the
/// viewport edge.
const SAFETY_PADDING: f64 = 64.0;
/// Extra slack subtracted on every fit check so boundary paragraphs never
/// overflow by a pixel.
const FIT_THRESHOLD: f64 = 10.0;

/// Viewport width below which the reader drops to the smaller font.
const NARROW_BREAKPOINT: f64 = 640.0;
const FONT_SIZE_NARROW: f64 = 14.0;
const FONT_SIZE_WIDE: f64 = 16.0;
const LINE_HEIGHT_FACTOR: f64 = 1.75;
/// Vertical margin rendered below each paragraph.
const PARAGRAPH_SPACING: f64 = 16.0;
/// Average glyph advance as a fraction of the font size, used to estimate
/// how many characters fit on one wrapped line.
const GLYPH_ADVANCE_EM: f64 = 0.5;

/// Measurement capability supplied by the host environment: lay out a run of
/// paragraphs at fixed font metrics and report the rendered height.
pub trait MeasureText {
    /// Height of the available content area.
    fn available_height(&self) -> f64;

    /// Rendered height of the given paragraphs, stacked in order.
    fn height_of(&self, paragraphs: &[&str]) -> f64;
}

/// Splits `text` into pages that fit the measured content area.
///
/// Greedy fill: paragraphs (non-blank lines of `text`) are appended to the
/// current page until the candidate no longer fits, at which point the page
/// is closed and the rejected paragraph starts the next one. A paragraph that
/// alone exceeds the limit gets a page of its own. Joining the pages back
/// together reproduces the paragraph sequence exactly.
pub fn paginate(text: &str, measurer: &dyn MeasureText) -> Vec<String> {
    let paragraphs: Vec<&str> = text.lines().filter(|p| !p.trim().is_empty()).collect();
    let max_height = measurer.available_height() - SAFETY_PADDING;

    let mut pages = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for paragraph in paragraphs {
        let mut candidate = current.clone();
        candidate.push(paragraph);

        if measurer.height_of(&candidate) > max_height - FIT_THRESHOLD && !current.is_empty() {
            pages.push(current.join("\n"));
            current = vec![paragraph];
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        pages.push(current.join("\n"));
    }

    pages
}

/// Deterministic stand-in for live layout measurement: estimates rendered
/// height from the viewport metrics the client reported.
///
/// Font size follows the viewport-width breakpoint and is fixed for the
/// lifetime of the measurer, so one pagination pass always measures at one
/// size.
pub struct FontMetricsMeasurer {
    viewport: Viewport,
    font_size: f64,
}

impl FontMetricsMeasurer {
    pub fn new(viewport: Viewport) -> Self {
        let font_size = if viewport.width < NARROW_BREAKPOINT {
            FONT_SIZE_NARROW
        } else {
            FONT_SIZE_WIDE
        };
        FontMetricsMeasurer {
            viewport,
            font_size,
        }
    }

    /// Number of wrapped lines a paragraph occupies at the current metrics.
    fn wrapped_lines(&self, paragraph: &str) -> usize {
        let chars_per_line =
            ((self.viewport.width / (self.font_size * GLYPH_ADVANCE_EM)) as usize).max(1);

        let mut lines = 0usize;
        let mut line_len = 0usize;
        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if line_len == 0 {
                lines += 1;
                line_len = word_len;
            } else if line_len + 1 + word_len <= chars_per_line {
                line_len += 1 + word_len;
            } else {
                lines += 1;
                line_len = word_len;
            }
            // Very long words keep overflowing onto fresh lines.
            while line_len > chars_per_line {
                lines += 1;
                line_len -= chars_per_line;
            }
        }
        lines.max(1)
    }
}

impl MeasureText for FontMetricsMeasurer {
    fn available_height(&self) -> f64 {
        self.viewport.height
    }

    fn height_of(&self, paragraphs: &[&str]) -> f64 {
        let line_height = self.font_size * LINE_HEIGHT_FACTOR;
        paragraphs
            .iter()
            .map(|p| self.wrapped_lines(p) as f64 * line_height + PARAGRAPH_SPACING)
            .sum()
    }
}
