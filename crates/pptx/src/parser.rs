//! PPTX reader: turns a .pptx archive into a [`SourceDocument`].

use crate::package::{attr, attr_i64, local_name, resolve_target, Package, RelAttrs, Relationships, REL_SLIDE};
use deck_core::shape::{ImageShape, Placeholder, PlaceholderKind, TableShape, TextShape};
use deck_core::{BoundingBox, DocumentReader, Error, PageSize, Result, Shape, SourceDocument, SourceSlide};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Reader for PPTX (Office Open XML) files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxReader;

impl PptxReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse an opened package.
    pub fn read_package(&self, package: &Package) -> Result<SourceDocument> {
        let presentation_part = package
            .presentation_part()
            .map_err(|e| Error::DocumentFormat(e.to_string()))?;
        let presentation = package
            .read_string(&presentation_part)
            .map_err(|e| Error::DocumentFormat(format!("no presentation part: {}", e)))?;
        let rels = package
            .relationships(&presentation_part)
            .map_err(|e| Error::DocumentFormat(e.to_string()))?;

        let info = parse_presentation(&presentation)?;
        let slide_paths = slide_order(&info.slide_ids, &rels, &presentation_part);
        log::debug!("Reading {} slide(s) from {}", slide_paths.len(), presentation_part);

        let slides = slide_paths
            .iter()
            .map(|path| self.read_slide(package, path))
            .collect();

        Ok(SourceDocument {
            slides,
            page_size: info.page_size,
        })
    }

    /// Parse one slide part. Problems are recorded on the slide, never raised.
    fn read_slide(&self, package: &Package, slide_path: &str) -> SourceSlide {
        let xml = match package.read_string(slide_path) {
            Ok(xml) => xml,
            Err(e) => {
                let mut slide = SourceSlide::new();
                slide.skip(format!("slide part unreadable: {}", e));
                return slide;
            }
        };

        let mut slide = parse_slide_xml(&xml);

        let rels = match package.relationships(slide_path) {
            Ok(rels) => rels,
            Err(e) => {
                slide.skipped.push(format!("slide relationships unreadable: {}", e));
                Relationships::default()
            }
        };
        slide.resolve_pictures(package, slide_path, &rels)
    }
}

impl DocumentReader for PptxReader {
    fn read(&self, bytes: &[u8]) -> Result<SourceDocument> {
        let package = Package::open(bytes).map_err(|e| Error::DocumentFormat(e.to_string()))?;
        self.read_package(&package)
    }
}

/// What the reader needs from `presentation.xml`.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PresentationInfo {
    /// Relationship ids of `p:sldIdLst`, in presentation order.
    pub slide_ids: Vec<String>,
    pub page_size: Option<PageSize>,
    /// Relationship ids of `p:sldMasterIdLst`, in order.
    pub master_ids: Vec<String>,
}

pub(crate) fn parse_presentation(xml: &str) -> Result<PresentationInfo> {
    let mut info = PresentationInfo::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rel_attrs: Option<RelAttrs> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let rel_attrs = rel_attrs.get_or_insert_with(|| RelAttrs::from_root(e));
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"sldId" => info.slide_ids.extend(rel_attrs.get(e, "id")),
                    b"sldMasterId" => info.master_ids.extend(rel_attrs.get(e, "id")),
                    b"sldSz" => {
                        if let (Some(width), Some(height)) = (attr_i64(e, b"cx"), attr_i64(e, b"cy")) {
                            info.page_size = Some(PageSize { width, height });
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::DocumentFormat(format!(
                    "Error parsing presentation: {}",
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(info)
}

/// Slide part paths in presentation order.
///
/// Uses `p:sldIdLst`; without one, falls back to the slide relationships
/// sorted by the number in their id or target.
fn slide_order(slide_ids: &[String], rels: &Relationships, presentation_part: &str) -> Vec<String> {
    if !slide_ids.is_empty() {
        return slide_ids
            .iter()
            .filter_map(|id| match rels.get(id) {
                Some(rel) => Some(resolve_target(presentation_part, &rel.target)),
                None => {
                    log::warn!("Slide id {} has no relationship; skipping", id);
                    None
                }
            })
            .collect();
    }

    let mut slides: Vec<(String, Option<usize>)> = rels
        .items
        .iter()
        .filter(|r| r.rel_type == REL_SLIDE)
        .map(|r| {
            let order = extract_slide_number(&r.target).or_else(|| extract_slide_number(&r.id));
            (resolve_target(presentation_part, &r.target), order)
        })
        .collect();

    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    slides.into_iter().map(|(path, _)| path).collect()
}

/// Extract a slide number from a string like "rId2" or "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeElement {
    Shape,
    Picture,
    Frame,
    Connector,
}

impl ShapeElement {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"sp" => Some(Self::Shape),
            b"pic" => Some(Self::Picture),
            b"graphicFrame" => Some(Self::Frame),
            b"cxnSp" => Some(Self::Connector),
            _ => None,
        }
    }
}

/// A shape whose embedded picture is resolved after the slide XML is read.
#[derive(Debug)]
enum ParsedShape {
    Ready(Shape),
    Picture { bounding_box: BoundingBox, embed: String },
}

/// Shapes of one slide before picture relationships are resolved.
#[derive(Debug, Default)]
struct ParsedSlide {
    shapes: Vec<ParsedShape>,
    skipped: Vec<String>,
}

impl ParsedSlide {
    fn resolve_pictures(self, package: &Package, slide_path: &str, rels: &Relationships) -> SourceSlide {
        let mut slide = SourceSlide::new();
        for reason in self.skipped {
            slide.skip(reason);
        }

        for shape in self.shapes {
            match shape {
                ParsedShape::Ready(shape) => slide.push(shape),
                ParsedShape::Picture { bounding_box, embed } => {
                    match load_picture(package, slide_path, rels, &embed) {
                        Ok((image_bytes, content_type)) => slide.push(Shape::Image(ImageShape {
                            bounding_box,
                            image_bytes,
                            content_type,
                        })),
                        Err(reason) => slide.skip(reason),
                    }
                }
            }
        }
        slide
    }
}

fn load_picture(
    package: &Package,
    slide_path: &str,
    rels: &Relationships,
    embed: &str,
) -> std::result::Result<(Vec<u8>, String), String> {
    let rel = rels
        .get(embed)
        .ok_or_else(|| format!("picture relationship {} missing", embed))?;
    if rel.external {
        return Err(format!("picture {} is linked, not embedded", embed));
    }
    let path = resolve_target(slide_path, &rel.target);
    let bytes = package
        .get(&path)
        .ok_or_else(|| format!("picture part {} missing", path))?;
    Ok((bytes.to_vec(), content_type_for(&path).to_string()))
}

/// Image MIME type from a part's extension.
pub(crate) fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("emf") => "image/x-emf",
        Some("wmf") => "image/x-wmf",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// State for the shape currently being read.
#[derive(Debug)]
struct ShapeBuilder {
    element: ShapeElement,
    nested: usize,
    bounding_box: BoundingBox,
    has_offset: bool,
    has_extent: bool,
    placeholder: Option<Placeholder>,
    has_text_body: bool,
    paragraphs: Vec<String>,
    paragraph: Option<String>,
    in_text: bool,
    embed: Option<String>,
    rel_attrs: RelAttrs,
    table: Option<Vec<Vec<String>>>,
    row: Option<Vec<String>>,
    cell: Option<Vec<String>>,
    error: Option<String>,
}

impl ShapeBuilder {
    fn new(element: ShapeElement, rel_attrs: RelAttrs) -> Self {
        Self {
            element,
            rel_attrs,
            nested: 0,
            bounding_box: BoundingBox::default(),
            has_offset: false,
            has_extent: false,
            placeholder: None,
            has_text_body: false,
            paragraphs: Vec::new(),
            paragraph: None,
            in_text: false,
            embed: None,
            table: None,
            row: None,
            cell: None,
            error: None,
        }
    }

    fn start(&mut self, e: &BytesStart) {
        let name = e.name();
        match local_name(name.as_ref()) {
            b"off" if !self.has_offset => {
                if let (Some(x), Some(y)) = (attr_i64(e, b"x"), attr_i64(e, b"y")) {
                    self.bounding_box.left = x;
                    self.bounding_box.top = y;
                    self.has_offset = true;
                }
            }
            b"ext" if !self.has_extent => {
                if let (Some(cx), Some(cy)) = (attr_i64(e, b"cx"), attr_i64(e, b"cy")) {
                    self.bounding_box.width = cx;
                    self.bounding_box.height = cy;
                    self.has_extent = true;
                }
            }
            b"ph" if self.placeholder.is_none() => {
                let idx = match attr(e, b"idx") {
                    Some(raw) => match raw.parse() {
                        Ok(idx) => Some(idx),
                        Err(_) => {
                            self.error = Some(format!("placeholder idx '{}' is not a number", raw));
                            None
                        }
                    },
                    None => None,
                };
                self.placeholder = Some(Placeholder {
                    kind: PlaceholderKind::from_ooxml(attr(e, b"type").as_deref()),
                    idx,
                });
            }
            b"txBody" if self.cell.is_none() => self.has_text_body = true,
            b"br" => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.push('\n');
                }
            }
            b"p" => self.paragraph = Some(String::new()),
            b"t" => self.in_text = true,
            b"blip" => {
                if let Some(embed) = self.rel_attrs.get(e, "embed") {
                    self.embed = Some(embed);
                }
            }
            b"tbl" => self.table = Some(Vec::new()),
            b"tr" => self.row = Some(Vec::new()),
            b"tc" => self.cell = Some(Vec::new()),
            _ => {}
        }
    }

    fn empty(&mut self, e: &BytesStart) {
        let name = e.name();
        match local_name(name.as_ref()) {
            // Self-closing paragraphs and cells carry no text.
            b"p" => self.finish_paragraph(String::new()),
            b"tc" => {
                if let Some(row) = self.row.as_mut() {
                    row.push(String::new());
                }
            }
            b"t" => {}
            _ => self.start(e),
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_text {
            if let Some(paragraph) = self.paragraph.as_mut() {
                paragraph.push_str(text);
            }
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"p" => {
                if let Some(paragraph) = self.paragraph.take() {
                    self.finish_paragraph(paragraph);
                }
            }
            b"tc" => {
                if let (Some(cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
                    row.push(cell.join("\n"));
                }
            }
            b"tr" => {
                if let (Some(row), Some(table)) = (self.row.take(), self.table.as_mut()) {
                    table.push(row);
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, paragraph: String) {
        match self.cell.as_mut() {
            Some(cell) => cell.push(paragraph),
            None => self.paragraphs.push(paragraph),
        }
    }

    fn finish(self) -> std::result::Result<ParsedShape, String> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let shape = match self.element {
            ShapeElement::Shape if self.has_text_body => Shape::Text(TextShape {
                bounding_box: self.bounding_box,
                placeholder: self.placeholder,
                text: self.paragraphs.join("\n"),
            }),
            ShapeElement::Picture => {
                return match self.embed {
                    Some(embed) => Ok(ParsedShape::Picture {
                        bounding_box: self.bounding_box,
                        embed,
                    }),
                    None => Err("picture without an embedded image".to_string()),
                }
            }
            ShapeElement::Frame => match self.table {
                Some(cells) => Shape::Table(TableShape {
                    bounding_box: self.bounding_box,
                    cells,
                }),
                None => Shape::Other,
            },
            _ => Shape::Other,
        };
        Ok(ParsedShape::Ready(shape))
    }
}

/// Walk a slide's shape tree in document order.
///
/// Group shapes are flattened into their children. Alternate-content
/// fallbacks are ignored so a shape is never read twice. A malformed document
/// keeps the shapes read before the error.
fn parse_slide_xml(xml: &str) -> ParsedSlide {
    let mut slide = ParsedSlide::default();
    let mut reader = Reader::from_str(xml);

    let mut current: Option<ShapeBuilder> = None;
    let mut fallback_depth = 0usize;
    let mut rel_attrs: Option<RelAttrs> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                slide.skipped.push(format!(
                    "slide XML malformed at byte {}: {}",
                    reader.buffer_position(),
                    e
                ));
                break;
            }
        };

        match event {
            Event::Start(ref e) => {
                let rel_attrs = rel_attrs.get_or_insert_with(|| RelAttrs::from_root(e));
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fallback" {
                    fallback_depth += 1;
                    continue;
                }
                if fallback_depth > 0 {
                    continue;
                }

                match (ShapeElement::from_local_name(local), current.as_mut()) {
                    (Some(element), None) => current = Some(ShapeBuilder::new(element, rel_attrs.clone())),
                    (Some(_), Some(builder)) => builder.nested += 1,
                    (None, Some(builder)) => builder.start(e),
                    (None, None) => {}
                }
            }
            Event::Empty(ref e) => {
                if fallback_depth > 0 {
                    continue;
                }
                if let Some(builder) = current.as_mut() {
                    builder.empty(e);
                }
            }
            Event::Text(ref e) => {
                if fallback_depth > 0 {
                    continue;
                }
                if let Some(builder) = current.as_mut() {
                    match e.unescape() {
                        Ok(text) => builder.text(&text),
                        Err(err) => builder.error = Some(format!("unreadable text: {}", err)),
                    }
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fallback" {
                    fallback_depth = fallback_depth.saturating_sub(1);
                    continue;
                }
                if fallback_depth > 0 {
                    continue;
                }

                if ShapeElement::from_local_name(local).is_some() {
                    if let Some(builder) = current.as_mut() {
                        if builder.nested > 0 {
                            builder.nested -= 1;
                            continue;
                        }
                    }
                    if let Some(builder) = current.take() {
                        match builder.finish() {
                            Ok(shape) => slide.shapes.push(shape),
                            Err(reason) => slide.skipped.push(reason),
                        }
                    }
                } else if let Some(builder) = current.as_mut() {
                    builder.end(local);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    slide
}
