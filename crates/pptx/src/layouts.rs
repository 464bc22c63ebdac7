//! Slide layout catalog of a template.

use crate::package::{attr, local_name, resolve_target, Package, RelAttrs, Relationships};
use deck_core::shape::{Placeholder, PlaceholderKind};
use deck_core::{Error, LayoutInfo, Report, Result, Stage};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A layout part and what it offers.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub path: String,
    pub info: LayoutInfo,
}

/// Layouts of every slide master, in master order.
///
/// Falls back to the layout parts present in the package when the masters
/// list none. Layouts that cannot be read are kept without placeholders and
/// reported.
pub fn layout_catalog(
    package: &Package,
    presentation_part: &str,
    presentation_rels: &Relationships,
    master_ids: &[String],
    report: &mut Report,
) -> Vec<CatalogEntry> {
    let mut paths: Vec<String> = Vec::new();

    for master_id in master_ids {
        let Some(rel) = presentation_rels.get(master_id) else {
            report.record(Stage::Fill, None, format!("slide master {} has no relationship", master_id));
            continue;
        };
        let master_path = resolve_target(presentation_part, &rel.target);
        match master_layouts(package, &master_path) {
            Ok(layouts) => {
                for path in layouts {
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
            Err(e) => report.record(Stage::Fill, None, format!("slide master {} unreadable: {}", master_path, e)),
        }
    }

    if paths.is_empty() {
        paths = loose_layout_parts(package);
    }

    paths
        .into_iter()
        .filter(|path| package.contains(path))
        .map(|path| {
            let info = match package.read_string(&path).and_then(|xml| parse_layout(&xml)) {
                Ok((info, problems)) => {
                    for problem in problems {
                        report.record(Stage::Fill, None, format!("layout {}: {}", path, problem));
                    }
                    info
                }
                Err(e) => {
                    report.record(Stage::Fill, None, format!("layout {} unreadable: {}", path, e));
                    LayoutInfo {
                        name: path.clone(),
                        placeholders: Vec::new(),
                    }
                }
            };
            CatalogEntry { path, info }
        })
        .collect()
}

/// Layout parts referenced by a master's `p:sldLayoutIdLst`.
fn master_layouts(package: &Package, master_path: &str) -> Result<Vec<String>> {
    let xml = package.read_string(master_path)?;
    let rels = package.relationships(master_path)?;

    let mut ids = Vec::new();
    let mut reader = Reader::from_str(&xml);
    reader.trim_text(true);
    let mut rel_attrs: Option<RelAttrs> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let rel_attrs = rel_attrs.get_or_insert_with(|| RelAttrs::from_root(e));
                if local_name(e.name().as_ref()) == b"sldLayoutId" {
                    ids.extend(rel_attrs.get(e, "id"));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlError(format!("Error parsing slide master: {}", e))),
            _ => {}
        }
    }

    Ok(ids
        .iter()
        .filter_map(|id| rels.get(id))
        .map(|rel| resolve_target(master_path, &rel.target))
        .collect())
}

/// Layout parts found by name, ordered by their number.
fn loose_layout_parts(package: &Package) -> Vec<String> {
    let mut parts: Vec<(u32, String)> = package
        .part_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slideLayouts/slideLayout")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    parts.sort();
    parts.into_iter().map(|(_, name)| name).collect()
}

/// Name and placeholders of one layout, plus any placeholders that were skipped.
pub fn parse_layout(xml: &str) -> Result<(LayoutInfo, Vec<String>)> {
    let mut name = String::new();
    let mut placeholders = Vec::new();
    let mut problems = Vec::new();

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"cSld" => name = attr(e, b"name").unwrap_or_default(),
                b"ph" => {
                    let kind = PlaceholderKind::from_ooxml(attr(e, b"type").as_deref());
                    match attr(e, b"idx").map(|raw| raw.parse::<u32>().map_err(|_| raw)) {
                        Some(Err(raw)) => {
                            problems.push(format!("placeholder idx '{}' is not a number", raw));
                        }
                        Some(Ok(idx)) => placeholders.push(Placeholder { kind, idx: Some(idx) }),
                        None => placeholders.push(Placeholder { kind, idx: None }),
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlError(format!("Error parsing slide layout: {}", e))),
            _ => {}
        }
    }

    Ok((LayoutInfo { name, placeholders }, problems))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::DeckFixture;
    use crate::parser::parse_presentation;

    fn catalog(bytes: &[u8]) -> (Vec<CatalogEntry>, Report) {
        let package = Package::open(bytes).unwrap();
        let presentation = package.read_string("ppt/presentation.xml").unwrap();
        let info = parse_presentation(&presentation).unwrap();
        let rels = package.relationships("ppt/presentation.xml").unwrap();
        let mut report = Report::new();
        let entries = layout_catalog(&package, "ppt/presentation.xml", &rels, &info.master_ids, &mut report);
        (entries, report)
    }

    #[test]
    fn test_catalog_in_master_order() {
        let bytes = DeckFixture::new()
            .layout("Title Slide", &[(Some("ctrTitle"), None), (Some("subTitle"), Some(1))])
            .layout("Title and Content", &[(Some("title"), None), (None, Some(1)), (Some("ftr"), Some(11))])
            .layout("Blank", &[])
            .build();

        let (entries, report) = catalog(&bytes);
        let names: Vec<&str> = entries.iter().map(|e| e.info.name.as_str()).collect();
        assert_eq!(names, vec!["Title Slide", "Title and Content", "Blank"]);
        assert_eq!(entries[1].path, "ppt/slideLayouts/slideLayout2.xml");
        assert!(entries[1].info.has_title() && entries[1].info.has_body());
        assert_eq!(entries[1].info.body_placeholder().unwrap().idx, Some(1));
        assert!(report.is_empty());
    }

    #[test]
    fn test_parse_layout_skips_bad_placeholder() {
        let xml = r#"<p:sldLayout xmlns:p="p"><p:cSld name="Odd"><p:spTree>
            <p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr></p:sp>
            <p:sp><p:nvSpPr><p:nvPr><p:ph type="body" idx="one"/></p:nvPr></p:nvSpPr></p:sp>
            </p:spTree></p:cSld></p:sldLayout>"#;
        let (info, problems) = parse_layout(xml).unwrap();
        assert_eq!(info.name, "Odd");
        assert_eq!(info.placeholders.len(), 1);
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn test_loose_layouts_when_masters_list_none() {
        let mut package = Package::new();
        package.put("ppt/slideLayouts/slideLayout10.xml", r#"<p:sldLayout xmlns:p="p"><p:cSld name="Ten"/></p:sldLayout>"#);
        package.put("ppt/slideLayouts/slideLayout2.xml", r#"<p:sldLayout xmlns:p="p"><p:cSld name="Two"/></p:sldLayout>"#);
        package.put("ppt/slideLayouts/_rels/slideLayout2.xml.rels", "<Relationships/>");

        let mut report = Report::new();
        let entries = layout_catalog(&package, "ppt/presentation.xml", &Relationships::default(), &[], &mut report);
        let names: Vec<&str> = entries.iter().map(|e| e.info.name.as_str()).collect();
        assert_eq!(names, vec!["Two", "Ten"]);
    }
}
