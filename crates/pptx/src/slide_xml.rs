//! Serialization of a planned slide into slide XML.

use deck_core::fill::SlideGeometry;
use deck_core::{BoundingBox, LayoutInfo, Placeholder, PlaceholderKind, PlannedSlide, PlannedTable, RgbColor, StyleConfig};
use quick_xml::escape::escape;

const SLIDE_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const SLIDE_CLOSE: &str = "</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>";

const BULLET_PROPERTIES: &str =
    r#"<a:pPr marL="285750" indent="-285750"><a:buFont typeface="Arial"/><a:buChar char="•"/></a:pPr>"#;
const PLAIN_PROPERTIES: &str = r#"<a:pPr marL="0" indent="0"><a:buNone/></a:pPr>"#;

const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

/// Header cells are this many points larger than body cells.
const HEADER_SIZE_BOOST: f32 = 1.0;

/// Character formatting applied to every run of a text frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStyle {
    pub font: String,
    pub size_pt: f32,
    pub color: RgbColor,
    pub bold: bool,
}

impl RunStyle {
    pub fn title(style: &StyleConfig) -> Self {
        Self {
            font: style.title_font.clone(),
            size_pt: style.title_size,
            color: style.title_color,
            bold: true,
        }
    }

    pub fn body(style: &StyleConfig) -> Self {
        Self {
            font: style.body_font.clone(),
            size_pt: style.body_size,
            color: style.body_color,
            bold: false,
        }
    }

    pub fn table_header(style: &StyleConfig) -> Self {
        Self {
            size_pt: style.body_size + HEADER_SIZE_BOOST,
            bold: true,
            ..Self::body(style)
        }
    }

    /// `a:rPr`, `a:endParaRPr` or another character-properties element.
    fn element(&self, tag: &str) -> String {
        let font = escape(&self.font);
        format!(
            r#"<a:{tag} lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="{font}"/><a:cs typeface="{font}"/></a:{tag}>"#,
            hundredths(self.size_pt),
            if self.bold { 1 } else { 0 },
            self.color.to_hex(),
        )
    }
}

/// Point size in the hundredths OOXML expects, within its accepted range.
fn hundredths(points: f32) -> i64 {
    ((points * 100.0).round() as i64).clamp(100, 400_000)
}

/// One `a:p`; newlines inside `text` become line breaks.
fn paragraph(text: &str, properties: &str, run: &RunStyle) -> String {
    let rpr = run.element("rPr");
    let mut xml = format!("<a:p>{}", properties);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            xml.push_str(&format!("<a:br>{}</a:br>", rpr));
        }
        if !line.is_empty() {
            xml.push_str(&format!("<a:r>{}<a:t>{}</a:t></a:r>", rpr, escape(line)));
        }
    }
    xml.push_str(&run.element("endParaRPr"));
    xml.push_str("</a:p>");
    xml
}

/// Where a text frame goes: bound to a layout placeholder or as a free text box.
enum Frame<'a> {
    Placeholder(&'a Placeholder),
    TextBox(BoundingBox),
}

/// Renders shapes with slide-unique ids.
struct SpTree {
    xml: String,
    next_id: u32,
}

impl SpTree {
    fn new() -> Self {
        Self {
            xml: String::from(SLIDE_OPEN),
            next_id: 2,
        }
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn text_shape(&mut self, name: &str, frame: Frame<'_>, paragraphs: &str) {
        let id = self.id();
        let (non_visual, properties, body_properties) = match frame {
            Frame::Placeholder(placeholder) => {
                let mut ph = String::from("<p:ph");
                if placeholder.kind != PlaceholderKind::Content {
                    ph.push_str(&format!(r#" type="{}""#, escape(placeholder.kind.as_ooxml())));
                }
                if let Some(idx) = placeholder.idx {
                    ph.push_str(&format!(r#" idx="{}""#, idx));
                }
                ph.push_str("/>");
                (
                    format!(r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr>"#, ph),
                    "<p:spPr/>".to_string(),
                    "<a:bodyPr/>",
                )
            }
            Frame::TextBox(bounds) => (
                r#"<p:cNvSpPr txBox="1"/><p:nvPr/>"#.to_string(),
                format!(
                    r#"<p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#,
                    xfrm("a", bounds)
                ),
                r#"<a:bodyPr wrap="square" rtlCol="0"><a:normAutofit/></a:bodyPr>"#,
            ),
        };

        self.xml.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/>{}</p:nvSpPr>{}<p:txBody>{}<a:lstStyle/>{}</p:txBody></p:sp>"#,
            id,
            name,
            id - 1,
            non_visual,
            properties,
            body_properties,
            paragraphs
        ));
    }

    fn table(&mut self, table: &PlannedTable, header: &RunStyle, body: &RunStyle) {
        let id = self.id();
        let column_width = table.column_width();
        let grid: String = (0..table.columns)
            .map(|_| format!(r#"<a:gridCol w="{}"/>"#, column_width))
            .collect();

        let rows: String = table
            .rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let run = if r == 0 { header } else { body };
                let cells: String = row
                    .iter()
                    .map(|cell| {
                        format!(
                            "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>",
                            paragraph(cell, "", run)
                        )
                    })
                    .collect();
                format!(r#"<a:tr h="{}">{}</a:tr>"#, table.row_height(), cells)
            })
            .collect();

        self.xml.push_str(&format!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="Table {}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>{}<a:graphic><a:graphicData uri="{}"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{}</a:tblGrid>{}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
            id,
            id - 1,
            xfrm("p", table.frame),
            TABLE_URI,
            grid,
            rows
        ));
    }

    fn finish(mut self) -> String {
        self.xml.push_str(SLIDE_CLOSE);
        self.xml
    }
}

fn xfrm(prefix: &str, bounds: BoundingBox) -> String {
    format!(
        r#"<{prefix}:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></{prefix}:xfrm>"#,
        bounds.left,
        bounds.top,
        bounds.width.max(0),
        bounds.height.max(0),
    )
}

/// Serialize `slide` for a slide created from `layout`.
///
/// Title and body bind to the layout's placeholders when it has them and
/// fall back to text boxes at `geometry` otherwise.
pub fn render_slide(slide: &PlannedSlide, layout: &LayoutInfo, geometry: SlideGeometry, style: &StyleConfig) -> String {
    let title_run = RunStyle::title(style);
    let body_run = RunStyle::body(style);
    let mut tree = SpTree::new();

    let title = paragraph(&slide.title, "", &title_run);
    match layout.title_placeholder() {
        Some(placeholder) => tree.text_shape("Title", Frame::Placeholder(placeholder), &title),
        None => tree.text_shape("TextBox", Frame::TextBox(geometry.title), &title),
    }

    let mut body: String = slide
        .paragraphs
        .iter()
        .map(|p| {
            let properties = if p.bulleted { BULLET_PROPERTIES } else { PLAIN_PROPERTIES };
            paragraph(&p.text, properties, &body_run)
        })
        .collect();
    if body.is_empty() {
        body = paragraph("", PLAIN_PROPERTIES, &body_run);
    }
    match layout.body_placeholder() {
        Some(placeholder) => tree.text_shape("Content", Frame::Placeholder(placeholder), &body),
        None => tree.text_shape("TextBox", Frame::TextBox(geometry.body), &body),
    }

    let header_run = RunStyle::table_header(style);
    for table in &slide.tables {
        tree.table(table, &header_run, &body_run);
    }

    tree.finish()
}
