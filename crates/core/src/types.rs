//! Domain types for extracted and paginated slide content.

use serde::{Deserialize, Serialize};

/// Position and size of a shape, in EMU (914400 per inch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl BoundingBox {
    /// Create a bounding box from its four components.
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Slide dimensions in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: i64,
    pub height: i64,
}

impl Default for PageSize {
    /// 10 x 7.5 inches, the classic 4:3 default.
    fn default() -> Self {
        Self {
            width: 9_144_000,
            height: 6_858_000,
        }
    }
}

/// Text content from one shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub bounding_box: BoundingBox,
    pub text: String,
}

/// An embedded raster image from one picture shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRun {
    pub bounding_box: BoundingBox,
    #[serde(skip)]
    pub image_bytes: Vec<u8>,
    pub content_type: String,
}

/// A table from one slide.
///
/// `rows` includes the header row at index 0. Callers that need only the
/// data rows must skip the first row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub slide_index: usize,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableRecord {
    /// Build a table record from its cell grid; the first row is the header.
    pub fn from_grid(slide_index: usize, grid: Vec<Vec<String>>) -> Self {
        Self {
            slide_index,
            header: grid.first().cloned().unwrap_or_default(),
            rows: grid,
        }
    }

    /// Number of grid columns used when rendering.
    ///
    /// The header decides the width; a table without header cells falls back
    /// to its widest row.
    pub fn column_count(&self) -> usize {
        if !self.header.is_empty() {
            self.header.len()
        } else {
            self.rows.iter().map(Vec::len).max().unwrap_or(0)
        }
    }

    /// Rows without the header row.
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Everything extracted from a single source slide.
///
/// Created once by the extractor; later stages only read from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 0-based ordinal of the source slide.
    pub index: usize,

    /// Text of the title placeholder, if the slide has a non-empty one.
    pub title_candidate: Option<String>,

    /// Text shapes in shape traversal order.
    pub text_runs: Vec<TextRun>,

    /// Picture shapes in shape traversal order.
    pub image_runs: Vec<ImageRun>,

    pub tables: Vec<TableRecord>,
}

impl SlideRecord {
    /// Create an empty record for the slide at `index`.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            title_candidate: None,
            text_runs: Vec::new(),
            image_runs: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Text runs sorted top-to-bottom, then left-to-right.
    pub fn text_runs_in_reading_order(&self) -> Vec<&TextRun> {
        let mut runs: Vec<&TextRun> = self.text_runs.iter().collect();
        runs.sort_by_key(|r| (r.bounding_box.top, r.bounding_box.left));
        runs
    }
}

/// Title and body derived from a slide record.
///
/// Paragraphs in `body` are separated by a blank line (`"\n\n"`). A reviewer
/// may overwrite both fields before pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedContent {
    pub title: String,
    pub body: String,
}

impl ResolvedContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// One unit of output content, destined for exactly one rendered slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub title: String,
    pub body: String,
    pub source_slide_index: usize,

    /// 0 for the first page of a slide, 1.. for continuation pages.
    pub continuation_ordinal: usize,
}

impl PageRecord {
    /// Whether this page continues a previous page of the same slide.
    pub fn is_continuation(&self) -> bool {
        self.continuation_ordinal > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, left: i64, top: i64) -> TextRun {
        TextRun {
            bounding_box: BoundingBox::new(left, top, 100, 100),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_reading_order() {
        let mut record = SlideRecord::new(0);
        record.text_runs.push(run("bottom", 0, 500));
        record.text_runs.push(run("top right", 400, 10));
        record.text_runs.push(run("top left", 0, 10));

        let ordered: Vec<&str> = record
            .text_runs_in_reading_order()
            .iter()
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(ordered, vec!["top left", "top right", "bottom"]);

        // Traversal order itself is untouched.
        assert_eq!(record.text_runs[0].text, "bottom");
    }

    #[test]
    fn test_table_from_grid() {
        let table = TableRecord::from_grid(
            2,
            vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["1".to_string(), "2".to_string()],
            ],
        );
        assert_eq!(table.header, vec!["A", "B"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.data_rows(), &[vec!["1".to_string(), "2".to_string()]]);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_column_count_without_header() {
        let table = TableRecord {
            slide_index: 0,
            header: Vec::new(),
            rows: vec![vec!["x".to_string()], vec!["a".into(), "b".into(), "c".into()]],
        };
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_empty_grid() {
        let table = TableRecord::from_grid(0, Vec::new());
        assert!(table.header.is_empty());
        assert!(table.data_rows().is_empty());
        assert_eq!(table.column_count(), 0);
    }
}
