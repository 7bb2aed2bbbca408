//! # PDF Report
//!
//! Paginated report for a stored application: title, the AI-generated
//! summary wrapped to the printable width, then three fixed field
//! sections. Layout is a vertical cursor in millimetres from the page
//! bottom; whenever a line would cross the bottom margin a fresh page is
//! started.
//!
//! The builtin Helvetica fonts carry no metrics, so line width is measured
//! with an approximate per-glyph advance table. Slightly conservative
//! widths only make lines break a little early, never overflow the margin.

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::application::ApplicationRecord;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const PRINTABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;

const PT_TO_MM: f32 = 0.352_778;

pub fn render_report(
    application: &ApplicationRecord,
    summary: &str,
) -> Result<Vec<u8>, printpdf::Error> {
    let (doc, page, layer) = PdfDocument::new(
        "Pension Application Report",
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    {
        let mut writer = ReportWriter {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            cursor: PAGE_HEIGHT - MARGIN,
        };

        writer.line("Pension Application Report", TITLE_SIZE, &bold);
        writer.gap(BODY_SIZE);

        writer.line("Summary", HEADING_SIZE, &bold);
        for text in wrap_text(summary, BODY_SIZE, PRINTABLE_WIDTH) {
            writer.line(&text, BODY_SIZE, &regular);
        }
        writer.gap(BODY_SIZE);

        for (heading, fields) in sections(application) {
            writer.line(heading, HEADING_SIZE, &bold);
            for (label, value) in fields {
                writer.line(&format!("{label}: {value}"), BODY_SIZE, &regular);
            }
            writer.gap(BODY_SIZE);
        }
    }

    doc.save_to_bytes()
}

fn sections(app: &ApplicationRecord) -> [(&'static str, Vec<(&'static str, String)>); 3] {
    [
        (
            "Personal Information",
            vec![
                ("Full Name", app.full_name.clone()),
                ("Email", app.email.clone()),
                ("Date of Birth", app.dob.clone()),
                ("NI Number", app.ni_number.clone()),
            ],
        ),
        (
            "Pension Details",
            vec![
                ("Years of Service", format!("{}", app.years_of_service)),
                ("Current Salary", format!("\u{a3}{:.2}", app.current_salary)),
                ("Annuity Type", app.annuity_type.clone()),
                ("Survivor Benefit", app.survivor_benefit.clone()),
                ("Healthcare", app.healthcare.clone()),
            ],
        ),
        (
            "Application Information",
            vec![
                ("Retirement Date", app.retirement_date.clone()),
                ("Submission Date", app.submission_date.clone()),
                ("Status", app.status.clone()),
            ],
        ),
    ]
}

struct ReportWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    cursor: f32,
}

impl ReportWriter<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        let height = line_height(size);

        if self.cursor - height < MARGIN {
            self.break_page();
        }

        self.cursor -= height;
        self.layer
            .use_text(text, size, Mm(MARGIN), Mm(self.cursor), font);
    }

    fn gap(&mut self, size: f32) {
        self.cursor -= line_height(size) / 2.0;
    }

    fn break_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT - MARGIN;
    }
}

fn line_height(size: f32) -> f32 {
    size * 1.4 * PT_TO_MM
}

/// Greedy word wrap against the printable width. Paragraph breaks in the
/// input survive as blank lines.
pub fn wrap_text(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };

            if text_width(&candidate, size) > max_width && !current.is_empty() {
                lines.push(current);
                current = word.to_string();
            } else {
                current = candidate;
            }
        }

        lines.push(current);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().map(glyph_advance).sum::<f32>() * size * PT_TO_MM
}

/// Advance widths in em for the Helvetica glyph classes that matter at
/// body size.
fn glyph_advance(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '!' | '|' | '\'' | '.' | ',' | ':' | ';' => 0.28,
        'f' | 't' | 'r' | 'I' | '-' | ' ' | '(' | ')' | '[' | ']' => 0.36,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.89,
        'A'..='Z' | '0'..='9' => 0.67,
        _ => 0.53,
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use crate::application::STATUS_PROCESSING;

    use super::*;

    fn record() -> ApplicationRecord {
        ApplicationRecord {
            id: ObjectId::new(),
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            dob: "1960-12-10".into(),
            ni_number: "QQ123456C".into(),
            years_of_service: 32.0,
            current_salary: 48500.0,
            annuity_type: "Fixed".into(),
            survivor_benefit: "50%".into(),
            healthcare: "Standard".into(),
            retirement_date: "2026-01-01".into(),
            terms_agreed: true,
            submission_date: "2026-08-30".into(),
            status: STATUS_PROCESSING.into(),
        }
    }

    #[test]
    fn report_starts_with_pdf_magic() {
        let bytes = render_report(&record(), "A short summary.").unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn long_summary_still_renders() {
        let summary = "word ".repeat(5000);
        let bytes = render_report(&record(), &summary).unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn wrap_keeps_short_text_on_one_line() {
        let lines = wrap_text("short summary", BODY_SIZE, PRINTABLE_WIDTH);

        assert_eq!(lines, vec!["short summary"]);
    }

    #[test]
    fn wrap_breaks_before_the_margin() {
        let text = "alpha beta gamma delta ".repeat(20);
        let lines = wrap_text(&text, BODY_SIZE, PRINTABLE_WIDTH);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, BODY_SIZE) <= PRINTABLE_WIDTH);
        }
    }

    #[test]
    fn wrap_never_splits_words() {
        let text = "alpha beta gamma delta ".repeat(20);
        for line in wrap_text(&text, BODY_SIZE, PRINTABLE_WIDTH) {
            for word in line.split(' ') {
                assert!(["alpha", "beta", "gamma", "delta"].contains(&word));
            }
        }
    }

    #[test]
    fn wrap_preserves_paragraph_breaks() {
        let lines = wrap_text("first\n\nsecond", BODY_SIZE, PRINTABLE_WIDTH);

        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn wrap_of_empty_text_is_empty() {
        assert!(wrap_text("", BODY_SIZE, PRINTABLE_WIDTH).is_empty());
        assert!(wrap_text("\n\n", BODY_SIZE, PRINTABLE_WIDTH).is_empty());
    }

    #[test]
    fn oversized_single_word_gets_its_own_line() {
        let text = format!("start {} end", "x".repeat(400));
        let lines = wrap_text(&text, BODY_SIZE, PRINTABLE_WIDTH);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "start");
        assert_eq!(lines[2], "end");
    }
}
