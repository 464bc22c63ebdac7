//! Classification of a slide's shapes into a [`SlideRecord`].

use crate::report::{Report, Stage};
use crate::sanitize::TextSanitizer;
use crate::shape::{Shape, SourceDocument, SourceSlide};
use crate::types::{ImageRun, SlideRecord, TableRecord, TextRun};

/// Turns parsed shape trees into per-slide records.
#[derive(Debug, Clone, Default)]
pub struct ShapeExtractor {
    sanitizer: TextSanitizer,
}

impl ShapeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract one record per slide, in slide order.
    ///
    /// Shapes the reader could not decode are reported in the returned
    /// [`Report`] and never abort their slide.
    pub fn extract(&self, document: &SourceDocument) -> (Vec<SlideRecord>, Report) {
        let mut report = Report::new();
        let records = document
            .slides
            .iter()
            .enumerate()
            .map(|(index, slide)| {
                for skipped in &slide.skipped {
                    report.record(Stage::Extract, Some(index), format!("shape skipped: {}", skipped.reason));
                }
                self.extract_slide(index, slide)
            })
            .collect();

        (records, report)
    }

    /// Classify the shapes of a single slide.
    pub fn extract_slide(&self, index: usize, slide: &SourceSlide) -> SlideRecord {
        let mut record = SlideRecord::new(index);

        for shape in &slide.shapes {
            match shape {
                Shape::Text(text_shape) => {
                    let text = self.sanitizer.sanitize(&text_shape.text);
                    if text.is_empty() {
                        continue;
                    }

                    let kind = text_shape.placeholder_kind();
                    if kind.is_some_and(|k| k.is_chrome()) {
                        continue;
                    }

                    if record.title_candidate.is_none() && kind.is_some_and(|k| k.is_title()) {
                        record.title_candidate = Some(text.clone());
                    }

                    record.text_runs.push(TextRun {
                        bounding_box: text_shape.bounding_box,
                        text,
                    });
                }
                Shape::Image(image) => {
                    if image.image_bytes.is_empty() {
                        continue;
                    }
                    record.image_runs.push(ImageRun {
                        bounding_box: image.bounding_box,
                        image_bytes: image.image_bytes.clone(),
                        content_type: image.content_type.clone(),
                    });
                }
                Shape::Table(table) => {
                    let grid: Vec<Vec<String>> = table
                        .cells
                        .iter()
                        .map(|row| row.iter().map(|c| self.sanitizer.sanitize(c)).collect())
                        .collect();
                    if grid.is_empty() {
                        continue;
                    }
                    record.tables.push(TableRecord::from_grid(index, grid));
                }
                Shape::Other => {}
            }
        }

        log::debug!(
            "Slide {}: {} text run(s), {} image(s), {} table(s)",
            index + 1,
            record.text_runs.len(),
            record.image_runs.len(),
            record.tables.len()
        );

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ImageShape, Placeholder, PlaceholderKind, TableShape, TextShape};
    use crate::types::BoundingBox;

    fn text(kind: Option<PlaceholderKind>, value: &str) -> Shape {
        Shape::Text(TextShape {
            bounding_box: BoundingBox::default(),
            placeholder: kind.map(|kind| Placeholder { kind, idx: None }),
            text: value.to_string(),
        })
    }

    #[test]
    fn test_title_candidate_and_runs() {
        let mut slide = SourceSlide::new();
        slide.push(text(Some(PlaceholderKind::Title), "  Q1 Results "));
        slide.push(text(None, "Revenue up 10%"));
        slide.push(text(Some(PlaceholderKind::Footer), "Confidential"));
        slide.push(text(Some(PlaceholderKind::SlideNumber), "7"));
        slide.push(text(None, "   "));

        let record = ShapeExtractor::new().extract_slide(0, &slide);
        assert_eq!(record.title_candidate.as_deref(), Some("Q1 Results"));
        let runs: Vec<&str> = record.text_runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(runs, vec!["Q1 Results", "Revenue up 10%"]);
    }

    #[test]
    fn test_blank_title_placeholder_is_not_a_candidate() {
        let mut slide = SourceSlide::new();
        slide.push(text(Some(PlaceholderKind::CenterTitle), "  "));
        slide.push(text(Some(PlaceholderKind::CenterTitle), "Welcome"));

        let record = ShapeExtractor::new().extract_slide(3, &slide);
        assert_eq!(record.index, 3);
        assert_eq!(record.title_candidate.as_deref(), Some("Welcome"));
    }

    #[test]
    fn test_images_and_tables() {
        let mut slide = SourceSlide::new();
        slide.push(Shape::Image(ImageShape {
            bounding_box: BoundingBox::new(1, 2, 3, 4),
            image_bytes: vec![1, 2, 3],
            content_type: "image/png".to_string(),
        }));
        slide.push(Shape::Table(TableShape {
            bounding_box: BoundingBox::default(),
            cells: vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["1".to_string(), "2".to_string()],
            ],
        }));
        slide.push(Shape::Other);

        let record = ShapeExtractor::new().extract_slide(1, &slide);
        assert_eq!(record.image_runs.len(), 1);
        assert_eq!(record.image_runs[0].content_type, "image/png");
        assert_eq!(record.tables.len(), 1);
        assert_eq!(record.tables[0].slide_index, 1);
        assert_eq!(record.tables[0].header, vec!["A", "B"]);
        assert_eq!(record.tables[0].rows.len(), 2);
    }

    #[test]
    fn test_skipped_shapes_are_reported() {
        let mut slide = SourceSlide::new();
        slide.push(text(None, "Still here"));
        slide.skip("picture rId9 has no target");

        let document = SourceDocument {
            slides: vec![slide],
            page_size: None,
        };
        let (records, report) = ShapeExtractor::new().extract(&document);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text_runs.len(), 1);
        assert_eq!(report.count(Stage::Extract), 1);
        assert_eq!(report.issues[0].slide_index, Some(0));
    }
}
