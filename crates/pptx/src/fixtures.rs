//! In-memory .pptx builders shared by the tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const SLIDE_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

pub const SLIDE_CLOSE: &str = "</p:spTree></p:cSld></p:sld>";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

struct FixtureSlide {
    body: String,
    rels: Vec<(String, String)>,
}

struct FixtureLayout {
    name: String,
    placeholders: Vec<(Option<String>, Option<u32>)>,
}

/// Builds a small but structurally complete presentation.
#[derive(Default)]
pub struct DeckFixture {
    slides: Vec<FixtureSlide>,
    layouts: Vec<FixtureLayout>,
    media: Vec<(String, Vec<u8>)>,
    reversed: bool,
    notes: bool,
    page_size: Option<(i64, i64)>,
}

impl DeckFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide whose spTree holds `body`, with extra relationships.
    pub fn slide(mut self, body: &str, rels: &[(&str, &str)]) -> Self {
        self.slides.push(FixtureSlide {
            body: body.to_string(),
            rels: rels.iter().map(|(id, t)| (id.to_string(), t.to_string())).collect(),
        });
        self
    }

    /// Add a layout with placeholders given as (type, idx).
    pub fn layout(mut self, name: &str, placeholders: &[(Option<&str>, Option<u32>)]) -> Self {
        self.layouts.push(FixtureLayout {
            name: name.to_string(),
            placeholders: placeholders
                .iter()
                .map(|(kind, idx)| (kind.map(str::to_string), *idx))
                .collect(),
        });
        self
    }

    pub fn media(mut self, path: &str, bytes: &[u8]) -> Self {
        self.media.push((path.to_string(), bytes.to_vec()));
        self
    }

    /// List slides in reverse order in `p:sldIdLst`.
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Slide size in EMU; 10 x 7.5 inches when not set.
    pub fn page_size(mut self, cx: i64, cy: i64) -> Self {
        self.page_size = Some((cx, cy));
        self
    }

    /// Give every slide a notes slide.
    pub fn with_notes(mut self) -> Self {
        self.notes = true;
        self
    }

    /// A plain text box shape.
    pub fn text_box(text: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="10" name="TextBox"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            text
        )
    }

    /// A placeholder shape.
    pub fn placeholder(kind: Option<&str>, idx: Option<u32>, text: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="11" name="Placeholder"/><p:cNvSpPr/><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            ph_xml(kind, idx),
            text
        )
    }

    /// A table graphic frame holding `rows`.
    pub fn table(rows: &[&[&str]]) -> String {
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let grid: String = (0..columns).map(|_| r#"<a:gridCol w="914400"/>"#).collect();
        let body: String = rows
            .iter()
            .map(|row| {
                let cells: String = row
                    .iter()
                    .map(|cell| format!(r#"<a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>{}</a:t></a:r></a:p></a:txBody></a:tc>"#, cell))
                    .collect();
                format!(r#"<a:tr h="370840">{}</a:tr>"#, cells)
            })
            .collect();
        format!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="12" name="Table"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="457200" y="3657600"/><a:ext cx="11277600" cy="741680"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblGrid>{}</a:tblGrid>{}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
            grid, body
        )
    }

    pub fn build(self) -> Vec<u8> {
        let (page_cx, page_cy) = self.page_size.unwrap_or((9_144_000, 6_858_000));
        let layouts = if self.layouts.is_empty() {
            vec![FixtureLayout {
                name: "Blank".to_string(),
                placeholders: Vec::new(),
            }]
        } else {
            self.layouts
        };

        let mut files: Vec<(String, String)> = Vec::new();
        let mut overrides = vec![
            ("/ppt/presentation.xml", "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml".to_string()),
            ("/ppt/slideMasters/slideMaster1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml".to_string()),
        ]
        .into_iter()
        .map(|(p, c)| (p.to_string(), c))
        .collect::<Vec<_>>();

        files.push((
            "_rels/.rels".into(),
            rels_xml(&[("rId1".into(), format!("{}/officeDocument", REL_NS), "ppt/presentation.xml".into())]),
        ));

        // Presentation
        let mut pres_rels = vec![(
            "rId1".to_string(),
            format!("{}/slideMaster", REL_NS),
            "slideMasters/slideMaster1.xml".to_string(),
        )];
        let mut order: Vec<usize> = (0..self.slides.len()).collect();
        if self.reversed {
            order.reverse();
        }
        let slide_ids: String = order
            .iter()
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, 100 + i))
            .collect();
        for i in 0..self.slides.len() {
            pres_rels.push((
                format!("rId{}", 100 + i),
                format!("{}/slide", REL_NS),
                format!("slides/slide{}.xml", i + 1),
            ));
        }
        files.push((
            "ppt/presentation.xml".into(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="{}" cy="{}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
                NS, slide_ids, page_cx, page_cy
            ),
        ));
        files.push(("ppt/_rels/presentation.xml.rels".into(), rels_xml(&pres_rels)));

        // Master and layouts
        let layout_ids: String = (0..layouts.len())
            .map(|i| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2147483649u64 + i as u64, i + 1))
            .collect();
        files.push((
            "ppt/slideMasters/slideMaster1.xml".into(),
            format!(
                r#"<p:sldMaster {}><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst>{}</p:sldLayoutIdLst></p:sldMaster>"#,
                NS, layout_ids
            ),
        ));
        let master_rels: Vec<(String, String, String)> = (0..layouts.len())
            .map(|i| {
                (
                    format!("rId{}", i + 1),
                    format!("{}/slideLayout", REL_NS),
                    format!("../slideLayouts/slideLayout{}.xml", i + 1),
                )
            })
            .collect();
        files.push(("ppt/slideMasters/_rels/slideMaster1.xml.rels".into(), rels_xml(&master_rels)));

        for (i, layout) in layouts.iter().enumerate() {
            let shapes: String = layout
                .placeholders
                .iter()
                .enumerate()
                .map(|(n, (kind, idx))| {
                    format!(
                        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="Placeholder {}"/><p:cNvSpPr/><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#,
                        n + 2,
                        n + 1,
                        ph_xml(kind.as_deref(), *idx)
                    )
                })
                .collect();
            let path = format!("ppt/slideLayouts/slideLayout{}.xml", i + 1);
            files.push((
                path.clone(),
                format!(
                    r#"<p:sldLayout {}><p:cSld name="{}"><p:spTree>{}</p:spTree></p:cSld></p:sldLayout>"#,
                    NS, layout.name, shapes
                ),
            ));
            files.push((
                format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", i + 1),
                rels_xml(&[(
                    "rId1".into(),
                    format!("{}/slideMaster", REL_NS),
                    "../slideMasters/slideMaster1.xml".into(),
                )]),
            ));
            overrides.push((
                format!("/{}", path),
                "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml".into(),
            ));
        }

        // Slides
        for (i, slide) in self.slides.iter().enumerate() {
            let path = format!("ppt/slides/slide{}.xml", i + 1);
            files.push((path.clone(), format!("{}{}{}", SLIDE_OPEN, slide.body, SLIDE_CLOSE)));

            let mut rels = vec![(
                "rId1".to_string(),
                format!("{}/slideLayout", REL_NS),
                "../slideLayouts/slideLayout1.xml".to_string(),
            )];
            rels.extend(
                slide
                    .rels
                    .iter()
                    .map(|(id, target)| (id.clone(), format!("{}/image", REL_NS), target.clone())),
            );
            if self.notes {
                let notes = format!("ppt/notesSlides/notesSlide{}.xml", i + 1);
                rels.push((
                    "rId50".into(),
                    format!("{}/notesSlide", REL_NS),
                    format!("../notesSlides/notesSlide{}.xml", i + 1),
                ));
                files.push((notes.clone(), format!(r#"<p:notes {}><p:cSld><p:spTree/></p:cSld></p:notes>"#, NS)));
                overrides.push((
                    format!("/{}", notes),
                    "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml".into(),
                ));
            }
            files.push((format!("ppt/slides/_rels/slide{}.xml.rels", i + 1), rels_xml(&rels)));
            overrides.push((
                format!("/{}", path),
                "application/vnd.openxmlformats-officedocument.presentationml.slide+xml".into(),
            ));
        }

        let content_types = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>{}</Types>"#,
            overrides
                .iter()
                .map(|(p, c)| format!(r#"<Override PartName="{}" ContentType="{}"/>"#, p, c))
                .collect::<String>()
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(content_types.as_bytes()).unwrap();
        for (name, content) in &files {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        for (name, bytes) in &self.media {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

fn ph_xml(kind: Option<&str>, idx: Option<u32>) -> String {
    let mut ph = String::from("<p:ph");
    if let Some(kind) = kind {
        ph.push_str(&format!(r#" type="{}""#, kind));
    }
    if let Some(idx) = idx {
        ph.push_str(&format!(r#" idx="{}""#, idx));
    }
    ph.push_str("/>");
    ph
}

fn rels_xml(rels: &[(String, String, String)]) -> String {
    let items: String = rels
        .iter()
        .map(|(id, kind, target)| format!(r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#, id, kind, target))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        items
    )
}
