//! Planning of output slides for the template filler.
//!
//! Turns page records and tables into [`PlannedSlide`]s (paragraphs with
//! bullet markers resolved, tables sized and stacked) and picks the layout
//! new slides are created from. Document writers only serialize the plan.

use crate::resolve::PARAGRAPH_SEPARATOR;
use crate::shape::Placeholder;
use crate::types::{BoundingBox, PageRecord, PageSize, TableRecord};

/// EMU per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// EMU per pixel at 96 dpi.
pub const EMU_PER_PX: i64 = 9_525;

const MARGIN_LEFT: i64 = EMU_PER_INCH / 2;
const TITLE_TOP: i64 = EMU_PER_INCH * 3 / 10;
const TITLE_HEIGHT: i64 = EMU_PER_INCH;
const BODY_TOP: i64 = EMU_PER_INCH * 14 / 10;
const BODY_HEIGHT: i64 = EMU_PER_INCH * 5;
const TABLE_TOP: i64 = EMU_PER_INCH * 4;
const TABLE_ROW_HEIGHT: i64 = EMU_PER_INCH * 4 / 10;
const TABLE_GAP: i64 = EMU_PER_INCH / 5;

/// Bullet markers recognized at the start of a body paragraph.
const BULLET_MARKERS: [&str; 2] = ["- ", "* "];

/// Slide layout available in a template, with its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutInfo {
    pub name: String,
    pub placeholders: Vec<Placeholder>,
}

impl LayoutInfo {
    pub fn has_title(&self) -> bool {
        self.placeholders.iter().any(|p| p.kind.is_title())
    }

    pub fn has_body(&self) -> bool {
        self.placeholders.iter().any(|p| p.kind.is_body())
    }

    /// The first title placeholder.
    pub fn title_placeholder(&self) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| p.kind.is_title())
    }

    /// The first body or content placeholder.
    pub fn body_placeholder(&self) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| p.kind.is_body())
    }
}

/// Pick the layout new slides are created from.
///
/// Prefers a layout with both a title and a body placeholder, then one with
/// a title, then the first layout. Returns `None` only for an empty list.
pub fn select_layout(layouts: &[LayoutInfo]) -> Option<usize> {
    if layouts.is_empty() {
        return None;
    }
    layouts
        .iter()
        .position(|l| l.has_title() && l.has_body())
        .or_else(|| layouts.iter().position(LayoutInfo::has_title))
        .or(Some(0))
}

/// One body paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub bulleted: bool,
}

/// Split a page body into paragraphs, stripping bullet markers.
pub fn body_paragraphs(body: &str) -> Vec<Paragraph> {
    body.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| match BULLET_MARKERS.iter().find_map(|m| p.strip_prefix(m)) {
            Some(rest) => Paragraph {
                text: rest.trim().to_string(),
                bulleted: true,
            },
            None => Paragraph {
                text: p.to_string(),
                bulleted: false,
            },
        })
        .collect()
}

/// A table ready to render: a rectangular grid and its frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTable {
    /// Row 0 is the header.
    pub rows: Vec<Vec<String>>,
    pub columns: usize,
    pub frame: BoundingBox,
}

impl PlannedTable {
    pub fn row_height(&self) -> i64 {
        TABLE_ROW_HEIGHT
    }

    pub fn column_width(&self) -> i64 {
        self.frame.width / self.columns.max(1) as i64
    }
}

/// Fallback frames for slides whose layout lacks placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideGeometry {
    pub title: BoundingBox,
    pub body: BoundingBox,
}

impl SlideGeometry {
    /// Default frames, inset half an inch from the left and right edges.
    pub fn for_page(page: PageSize) -> Self {
        let width = (page.width - 2 * MARGIN_LEFT).max(EMU_PER_INCH);
        Self {
            title: BoundingBox::new(MARGIN_LEFT, TITLE_TOP, width, TITLE_HEIGHT),
            body: BoundingBox::new(MARGIN_LEFT, BODY_TOP, width, BODY_HEIGHT),
        }
    }

    /// Size of the body frame in pixels, the box metric pagination fills.
    pub fn body_px(&self) -> (f32, f32) {
        (
            self.body.width as f32 / EMU_PER_PX as f32,
            self.body.height as f32 / EMU_PER_PX as f32,
        )
    }
}

/// Everything needed to render one output slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSlide {
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<PlannedTable>,
    pub source_slide_index: usize,
    pub continuation_ordinal: usize,
}

impl PlannedSlide {
    /// Move table frames into the body column of `page`, keeping their
    /// vertical placement.
    pub fn fit_to_page(&mut self, page: PageSize) {
        let body = SlideGeometry::for_page(page).body;
        for table in &mut self.tables {
            table.frame.left = body.left;
            table.frame.width = body.width;
        }
    }
}

/// Size a table into a grid, zip-truncating each row to the column count.
fn plan_table(table: &TableRecord, left: i64, top: i64, width: i64) -> Option<PlannedTable> {
    let columns = table.column_count();
    if columns == 0 || table.rows.is_empty() {
        return None;
    }

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row.iter().take(columns).cloned().collect();
            cells.resize(columns, String::new());
            cells
        })
        .collect();

    let height = rows.len() as i64 * TABLE_ROW_HEIGHT;
    Some(PlannedTable {
        rows,
        columns,
        frame: BoundingBox::new(left, top, width, height),
    })
}

/// Plan one output slide per page record, in order.
///
/// Tables of a source slide are placed on its first page only, stacked
/// downwards from a fixed origin.
pub fn plan_slides(pages: &[PageRecord], tables: &[TableRecord], page: PageSize) -> Vec<PlannedSlide> {
    let geometry = SlideGeometry::for_page(page);

    pages
        .iter()
        .map(|record| {
            let mut planned_tables = Vec::new();
            if record.continuation_ordinal == 0 {
                let mut top = TABLE_TOP;
                for table in tables.iter().filter(|t| t.slide_index == record.source_slide_index) {
                    if let Some(planned) = plan_table(table, geometry.body.left, top, geometry.body.width) {
                        top += planned.frame.height + TABLE_GAP;
                        planned_tables.push(planned);
                    }
                }
            }

            PlannedSlide {
                title: record.title.clone(),
                paragraphs: body_paragraphs(&record.body),
                tables: planned_tables,
                source_slide_index: record.source_slide_index,
                continuation_ordinal: record.continuation_ordinal,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::PlaceholderKind;

    fn layout(name: &str, kinds: &[PlaceholderKind]) -> LayoutInfo {
        LayoutInfo {
            name: name.to_string(),
            placeholders: kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| Placeholder {
                    kind: kind.clone(),
                    idx: Some(i as u32),
                })
                .collect(),
        }
    }

    fn page(title: &str, body: &str, index: usize, ordinal: usize) -> PageRecord {
        PageRecord {
            title: title.to_string(),
            body: body.to_string(),
            source_slide_index: index,
            continuation_ordinal: ordinal,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_select_layout_prefers_title_and_body() {
        let layouts = vec![
            layout("Title Slide", &[PlaceholderKind::CenterTitle, PlaceholderKind::Subtitle]),
            layout("Blank", &[]),
            layout("Title and Content", &[PlaceholderKind::Title, PlaceholderKind::Content]),
        ];
        assert_eq!(select_layout(&layouts), Some(2));
    }

    #[test]
    fn test_select_layout_fallbacks() {
        let title_only = vec![
            layout("Blank", &[PlaceholderKind::Footer]),
            layout("Title Only", &[PlaceholderKind::Title]),
        ];
        assert_eq!(select_layout(&title_only), Some(1));

        let blank = vec![layout("Blank", &[]), layout("Other", &[PlaceholderKind::Body])];
        assert_eq!(select_layout(&blank), Some(0));
        assert_eq!(select_layout(&[]), None);
    }

    #[test]
    fn test_body_paragraphs_and_bullets() {
        let paragraphs = body_paragraphs("Revenue up 10%\n\n- Risk: supply chain\n\n*  starred\n\n-no space");
        assert_eq!(
            paragraphs,
            vec![
                Paragraph {
                    text: "Revenue up 10%".into(),
                    bulleted: false
                },
                Paragraph {
                    text: "Risk: supply chain".into(),
                    bulleted: true
                },
                Paragraph {
                    text: "starred".into(),
                    bulleted: true
                },
                Paragraph {
                    text: "-no space".into(),
                    bulleted: false
                },
            ]
        );
        assert!(body_paragraphs("").is_empty());
    }

    #[test]
    fn test_table_grid_row_major() {
        let table = TableRecord {
            slide_index: 0,
            header: strings(&["A", "B"]),
            rows: vec![strings(&["A", "B"]), strings(&["1", "2"])],
        };
        let slides = plan_slides(&[page("T", "", 0, 0)], &[table], PageSize::default());

        let planned = &slides[0].tables[0];
        assert_eq!(planned.columns, 2);
        assert_eq!(planned.rows, vec![strings(&["A", "B"]), strings(&["1", "2"])]);
        assert_eq!(planned.frame.height, 2 * planned.row_height());
    }

    #[test]
    fn test_ragged_rows_are_zip_truncated() {
        let table = TableRecord {
            slide_index: 0,
            header: strings(&["A", "B"]),
            rows: vec![strings(&["A", "B"]), strings(&["1", "2", "3"]), strings(&["x"])],
        };
        let slides = plan_slides(&[page("T", "", 0, 0)], &[table], PageSize::default());
        assert_eq!(
            slides[0].tables[0].rows,
            vec![strings(&["A", "B"]), strings(&["1", "2"]), strings(&["x", ""])]
        );
    }

    #[test]
    fn test_tables_stack_on_first_page_only() {
        let table = |rows: usize| TableRecord {
            slide_index: 1,
            header: strings(&["h"]),
            rows: vec![strings(&["h"]); rows],
        };
        let pages = vec![page("A", "", 0, 0), page("B", "x", 1, 0), page("B (CONTD...)", "y", 1, 1)];
        let slides = plan_slides(&pages, &[table(2), table(3)], PageSize::default());

        assert!(slides[0].tables.is_empty());
        assert_eq!(slides[1].tables.len(), 2);
        assert!(slides[2].tables.is_empty());

        let first = slides[1].tables[0].frame;
        let second = slides[1].tables[1].frame;
        assert_eq!(second.top, first.top + first.height + TABLE_GAP);
        assert_eq!(second.left, first.left);
    }

    #[test]
    fn test_empty_tables_are_dropped() {
        let table = TableRecord {
            slide_index: 0,
            header: Vec::new(),
            rows: Vec::new(),
        };
        let slides = plan_slides(&[page("T", "", 0, 0)], &[table], PageSize::default());
        assert!(slides[0].tables.is_empty());
    }

    #[test]
    fn test_geometry_follows_page_width() {
        let wide = SlideGeometry::for_page(PageSize {
            width: 12_192_000,
            height: 6_858_000,
        });
        assert_eq!(wide.title.left, EMU_PER_INCH / 2);
        assert_eq!(wide.body.width, 12_192_000 - EMU_PER_INCH);

        let classic = SlideGeometry::for_page(PageSize::default());
        assert_eq!(classic.body.width, EMU_PER_INCH * 9);
        assert_eq!(classic.body_px(), (864.0, 480.0));
    }

    #[test]
    fn test_tables_refit_to_narrower_page() {
        let wide = PageSize {
            width: 12_192_000,
            height: 6_858_000,
        };
        let table = TableRecord::from_grid(0, vec![strings(&["A", "B"]), strings(&["1", "2"])]);
        let mut slides = plan_slides(&[page("T", "", 0, 0)], &[table], wide);
        let planned = slides[0].tables[0].frame;
        assert_eq!(planned.width, 12_192_000 - EMU_PER_INCH);

        let classic = PageSize::default();
        slides[0].fit_to_page(classic);
        let fitted = slides[0].tables[0].frame;
        assert!(fitted.left + fitted.width <= classic.width);
        assert_eq!(fitted.width, SlideGeometry::for_page(classic).body.width);
        assert_eq!((fitted.top, fitted.height), (planned.top, planned.height));
        assert_eq!(slides[0].tables[0].column_width(), fitted.width / 2);
    }

    #[test]
    fn test_plan_keeps_page_order() {
        let pages = vec![page("One", "a", 0, 0), page("One (CONTD...)", "b", 0, 1), page("Two", "- c", 1, 0)];
        let slides = plan_slides(&pages, &[], PageSize::default());
        let titles: Vec<&str> = slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "One (CONTD...)", "Two"]);
        assert!(slides[2].paragraphs[0].bulleted);
    }
}
