//! PPTX writer: fills a template (or a blank package) with planned slides.

use crate::blank::blank_package;
use crate::layouts::{layout_catalog, CatalogEntry};
use crate::package::{
    local_name, relative_target, rels_path, resolve_target, ContentTypes, Package, RelAttrs, Relationships,
    CONTENT_TYPES_PART, CT_SLIDE, REL_SLIDE, REL_SLIDE_LAYOUT,
};
use crate::parser::parse_presentation;
use crate::slide_xml::render_slide;
use deck_core::fill::SlideGeometry;
use deck_core::{select_layout, DocumentWriter, Error, PageSize, PlannedSlide, Report, Result, StyleConfig};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

/// First id handed out in `p:sldIdLst`.
const FIRST_SLIDE_ID: u32 = 256;

/// Slide relationships whose targets belong to the slide alone.
const SLIDE_OWNED_SUFFIXES: [&str; 2] = ["/notesSlide", "/comments"];

/// Writer for PPTX (Office Open XML) files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxWriter;

impl PptxWriter {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentWriter for PptxWriter {
    fn write(
        &self,
        template: Option<&[u8]>,
        slides: &[PlannedSlide],
        style: &StyleConfig,
        page_size: Option<PageSize>,
        report: &mut Report,
    ) -> Result<Vec<u8>> {
        let package = match template {
            Some(bytes) => Package::open(bytes)
                .map_err(|e| Error::DocumentWrite(format!("template is not a readable presentation: {}", e)))?,
            None => blank_package(page_size.unwrap_or_default()),
        };

        let mut deck = Deck::open(package)?;
        let removed = deck.remove_slides()?;
        if removed > 0 {
            log::debug!("Removed {} existing slide(s) from template", removed);
        }

        let catalog = deck.layouts(report);
        let infos: Vec<_> = catalog.iter().map(|entry| entry.info.clone()).collect();
        let chosen = select_layout(&infos)
            .ok_or_else(|| Error::InvalidConfig("template has no slide layouts".to_string()))?;
        let layout = &catalog[chosen];
        log::debug!("Using layout '{}' ({})", layout.info.name, layout.path);

        for slide in slides {
            deck.append_slide(layout, slide, style);
        }

        deck.finish()
    }
}

fn write_error(e: Error) -> Error {
    match e {
        Error::DocumentWrite(_) => e,
        other => Error::DocumentWrite(other.to_string()),
    }
}

/// A presentation package being edited.
struct Deck {
    package: Package,
    presentation_part: String,
    presentation_xml: String,
    rels: Relationships,
    content_types: ContentTypes,
    master_ids: Vec<String>,
    page_size: PageSize,
    slide_list: Vec<(u32, String)>,
}

impl Deck {
    fn open(package: Package) -> Result<Self> {
        let presentation_part = package.presentation_part().map_err(write_error)?;
        let presentation_xml = package.read_string(&presentation_part).map_err(write_error)?;
        let rels = package.relationships(&presentation_part).map_err(write_error)?;
        let content_types = package
            .read_string(CONTENT_TYPES_PART)
            .and_then(|xml| ContentTypes::parse(&xml))
            .map_err(write_error)?;
        let info = parse_presentation(&presentation_xml).map_err(write_error)?;

        Ok(Self {
            package,
            presentation_part,
            presentation_xml,
            rels,
            content_types,
            master_ids: info.master_ids,
            page_size: info.page_size.unwrap_or_default(),
            slide_list: Vec::new(),
        })
    }

    /// Drop every existing slide with its notes and comments.
    fn remove_slides(&mut self) -> Result<usize> {
        let slide_rels: Vec<_> = self
            .rels
            .items
            .iter()
            .filter(|r| r.rel_type == REL_SLIDE)
            .cloned()
            .collect();

        for rel in &slide_rels {
            let slide_path = resolve_target(&self.presentation_part, &rel.target);
            let owned = self.package.relationships(&slide_path).map_err(write_error)?;
            for child in owned
                .items
                .iter()
                .filter(|c| !c.external && SLIDE_OWNED_SUFFIXES.iter().any(|s| c.rel_type.ends_with(s)))
            {
                self.remove_part(&resolve_target(&slide_path, &child.target));
            }
            self.remove_part(&slide_path);
        }

        self.rels.items.retain(|r| r.rel_type != REL_SLIDE);
        Ok(slide_rels.len())
    }

    fn remove_part(&mut self, part: &str) {
        self.package.remove(part);
        self.package.remove(&rels_path(part));
        self.content_types.remove_override(part);
    }

    fn layouts(&self, report: &mut Report) -> Vec<CatalogEntry> {
        layout_catalog(
            &self.package,
            &self.presentation_part,
            &self.rels,
            &self.master_ids,
            report,
        )
    }

    fn next_slide_path(&self) -> String {
        let mut n = self.slide_list.len() + 1;
        loop {
            let path = format!("ppt/slides/slide{}.xml", n);
            if !self.package.contains(&path) {
                return path;
            }
            n += 1;
        }
    }

    fn append_slide(&mut self, layout: &CatalogEntry, slide: &PlannedSlide, style: &StyleConfig) {
        let path = self.next_slide_path();
        let mut slide = slide.clone();
        slide.fit_to_page(self.page_size);
        let xml = render_slide(&slide, &layout.info, SlideGeometry::for_page(self.page_size), style);
        self.package.put(&path, xml);

        let mut slide_rels = Relationships::default();
        slide_rels.add(REL_SLIDE_LAYOUT, relative_target(&path, &layout.path));
        self.package.put(&rels_path(&path), slide_rels.to_xml());

        self.content_types.set_override(&path, CT_SLIDE);
        let id = self
            .rels
            .add(REL_SLIDE, relative_target(&self.presentation_part, &path));
        self.slide_list
            .push((FIRST_SLIDE_ID + self.slide_list.len() as u32, id));
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let presentation = rewrite_slide_list(&self.presentation_xml, &self.slide_list)?;
        self.package.put(&self.presentation_part, presentation);
        self.package
            .put(&rels_path(&self.presentation_part), self.rels.to_xml());
        self.package.put(CONTENT_TYPES_PART, self.content_types.to_xml());
        self.package.to_bytes().map_err(write_error)
    }
}

fn slide_list_xml(prefix: &str, rel_attrs: &RelAttrs, entries: &[(u32, String)]) -> String {
    let p = if prefix.is_empty() { String::new() } else { format!("{}:", prefix) };
    let rel_id_attr = rel_attrs.qualified("id");
    let items: String = entries
        .iter()
        .map(|(id, rel_id)| format!(r#"<{p}sldId id="{}" {}="{}"/>"#, id, rel_id_attr, rel_id))
        .collect();
    format!("<{p}sldIdLst>{}</{p}sldIdLst>", items)
}

fn prefix_of(name: &[u8]) -> String {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => String::from_utf8_lossy(&name[..pos]).into_owned(),
        None => String::new(),
    }
}

/// Replace `p:sldIdLst` in presentation XML.
///
/// Custom shows and the root extension list (which holds slide sections)
/// refer to old slide ids and are dropped. A missing list is inserted
/// before `p:sldSz`.
fn rewrite_slide_list(xml: &str, entries: &[(u32, String)]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut depth = 0usize;
    let mut skip_depth = 0usize;
    let mut written = false;
    let mut rel_attrs: Option<RelAttrs> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::DocumentWrite(format!("Error parsing presentation: {}", e)))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let is_start = matches!(event, Event::Start(_));
                let rel_attrs = rel_attrs.get_or_insert_with(|| RelAttrs::from_root(e));
                let name = e.name();
                let local = local_name(name.as_ref());

                let dropped = match local {
                    b"sldIdLst" => {
                        if !written {
                            writer
                                .get_mut()
                                .extend_from_slice(slide_list_xml(&prefix_of(name.as_ref()), rel_attrs, entries).as_bytes());
                            written = true;
                        }
                        true
                    }
                    b"custShowLst" => true,
                    b"extLst" => depth == 1,
                    b"sldSz" if !written && depth == 1 => {
                        writer
                            .get_mut()
                            .extend_from_slice(slide_list_xml(&prefix_of(name.as_ref()), rel_attrs, entries).as_bytes());
                        written = true;
                        false
                    }
                    _ => false,
                };

                if dropped {
                    if is_start {
                        skip_depth = 1;
                    }
                    continue;
                }
                if is_start {
                    depth += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }

        writer
            .write_event(event)
            .map_err(|e| Error::DocumentWrite(format!("Error writing presentation: {}", e)))?;
    }

    if !written {
        return Err(Error::DocumentWrite("presentation has no slide size".to_string()));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| Error::DocumentWrite(e.to_string()))
}
