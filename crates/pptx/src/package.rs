//! In-memory OPC package: the ZIP parts of a .pptx and their relationships.

use deck_core::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

/// Namespace of relationship-id attributes such as `r:id` and `r:embed`.
pub const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// Extract the local name from a potentially namespaced XML name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Value of the attribute whose qualified name is exactly `key`.
pub fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Integer attribute value, if present and well-formed.
pub fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

/// Relationship-id attribute names of one XML part.
///
/// The prefix is taken from the `xmlns:*` declaration on the part's root
/// element that binds [`NS_RELATIONSHIPS`], falling back to `r`.
/// Declarations on descendant elements are not considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelAttrs {
    prefix: String,
}

impl Default for RelAttrs {
    fn default() -> Self {
        Self { prefix: "r".to_string() }
    }
}

impl RelAttrs {
    pub fn from_root(root: &BytesStart) -> Self {
        root.attributes()
            .flatten()
            .find_map(|a| {
                let prefix = a.key.as_ref().strip_prefix(b"xmlns:")?;
                let value = a.unescape_value().ok()?;
                (value == NS_RELATIONSHIPS).then(|| String::from_utf8_lossy(prefix).into_owned())
            })
            .map(|prefix| Self { prefix })
            .unwrap_or_default()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Qualified attribute name, e.g. `r:id` for `local = "id"`.
    pub fn qualified(&self, local: &str) -> String {
        format!("{}:{}", self.prefix, local)
    }

    /// Value of the relationship attribute `local` on `e`.
    pub fn get(&self, e: &BytesStart, local: &str) -> Option<String> {
        attr(e, self.qualified(local).as_bytes())
    }
}

/// Path of the relationships part belonging to `part`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the part that owns it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Target of `to_part` written relative to the directory of `from_part`.
pub fn relative_target(from_part: &str, to_part: &str) -> String {
    let from_dir: Vec<&str> = match from_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to: Vec<&str> = to_part.split('/').collect();

    let common = from_dir
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; from_dir.len() - common];
    parts.extend(&to[common..]);
    parts.join("/")
}

/// One entry of a relationships part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// The relationships of one part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    pub items: Vec<Relationship>,
}

impl Relationships {
    /// Parse a `.rels` document.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut items = Vec::new();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) else {
                        continue;
                    };
                    items.push(Relationship {
                        id,
                        rel_type: attr(e, b"Type").unwrap_or_default(),
                        target,
                        external: attr(e, b"TargetMode").as_deref() == Some("External"),
                    });
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlError(format!("Error parsing relationships: {}", e))),
                _ => {}
            }
        }

        Ok(Self { items })
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.id == id)
    }

    /// First relationship of the given type.
    pub fn first_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.items.iter().find(|r| r.rel_type == rel_type)
    }

    /// An id not used by any relationship yet.
    pub fn next_id(&self) -> String {
        let max = self
            .items
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Add a relationship and return its id.
    pub fn add(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        let id = self.next_id();
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            external: false,
        });
        id
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        for rel in &self.items {
            xml.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>",
                escape(&rel.id),
                escape(&rel.rel_type),
                escape(&rel.target),
                if rel.external { " TargetMode=\"External\"" } else { "" }
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Parsed `[Content_Types].xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// (extension, content type)
    pub defaults: Vec<(String, String)>,
    /// (part name with leading '/', content type)
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut types = Self::default();
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"Default" => {
                            if let (Some(ext), Some(ct)) = (attr(e, b"Extension"), attr(e, b"ContentType")) {
                                types.defaults.push((ext, ct));
                            }
                        }
                        b"Override" => {
                            if let (Some(part), Some(ct)) = (attr(e, b"PartName"), attr(e, b"ContentType")) {
                                types.overrides.push((part, ct));
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlError(format!("Error parsing content types: {}", e))),
                _ => {}
            }
        }

        Ok(types)
    }

    /// Set the override for `part` (given without leading '/').
    pub fn set_override(&mut self, part: &str, content_type: &str) {
        let name = format!("/{}", part);
        self.overrides.retain(|(p, _)| *p != name);
        self.overrides.push((name, content_type.to_string()));
    }

    pub fn remove_override(&mut self, part: &str) {
        let name = format!("/{}", part);
        self.overrides.retain(|(p, _)| *p != name);
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
        );
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                escape(ext),
                escape(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                "<Override PartName=\"{}\" ContentType=\"{}\"/>",
                escape(part),
                escape(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

/// All parts of a package, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file entry of a ZIP archive.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;
            parts.push((name, data));
        }

        Ok(Self { parts })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.as_slice())
    }

    /// A part decoded as UTF-8 text.
    pub fn read_string(&self, name: &str) -> Result<String> {
        let data = self
            .get(name)
            .ok_or_else(|| Error::ZipError(format!("File not found in archive '{}'", name)))?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::XmlError(format!("'{}' is not UTF-8: {}", name, e)))
    }

    /// The relationships of `part`; a missing `.rels` part means none.
    pub fn relationships(&self, part: &str) -> Result<Relationships> {
        let path = rels_path(part);
        if !self.contains(&path) {
            return Ok(Relationships::default());
        }
        Relationships::parse(&self.read_string(&path)?)
    }

    /// Insert or replace a part.
    pub fn put(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let data = data.into();
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.parts.retain(|(n, _)| n != name);
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }

    /// The main presentation part, located through the package relationships.
    pub fn presentation_part(&self) -> Result<String> {
        let root = self.relationships("")?;
        Ok(root
            .first_of_type(REL_OFFICE_DOCUMENT)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| DEFAULT_PRESENTATION_PART.to_string()))
    }

    /// Serialize to ZIP bytes, content types first.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let ordered = self
            .parts
            .iter()
            .filter(|(n, _)| n == CONTENT_TYPES_PART)
            .chain(self.parts.iter().filter(|(n, _)| n != CONTENT_TYPES_PART));

        for (name, data) in ordered {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
            zip.write_all(data)
                .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", name, e)))?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_rel_attrs_follow_root_declaration() {
        let xml = format!(
            r#"<p:presentation xmlns:p="p" xmlns:rel="{}"><p:sldId id="256" rel:id="rId7"/></p:presentation>"#,
            NS_RELATIONSHIPS
        );
        let mut reader = Reader::from_str(&xml);
        let root = match reader.read_event().unwrap() {
            Event::Start(e) => e.into_owned(),
            other => panic!("unexpected event {:?}", other),
        };
        let rel_attrs = RelAttrs::from_root(&root);
        assert_eq!(rel_attrs.prefix(), "rel");
        assert_eq!(rel_attrs.qualified("id"), "rel:id");

        let slide_id = match reader.read_event().unwrap() {
            Event::Empty(e) => e.into_owned(),
            other => panic!("unexpected event {:?}", other),
        };
        assert_eq!(rel_attrs.get(&slide_id, "id").as_deref(), Some("rId7"));

        let undeclared = BytesStart::new("p:presentation");
        assert_eq!(RelAttrs::from_root(&undeclared), RelAttrs::default());
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(rels_path("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
        assert_eq!(rels_path(""), "_rels/.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(resolve_target("ppt/presentation.xml", "slides/slide2.xml"), "ppt/slides/slide2.xml");
        assert_eq!(resolve_target("", "ppt/presentation.xml"), "ppt/presentation.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "/ppt/media/x.png"), "ppt/media/x.png");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(
            relative_target("ppt/slides/slide1.xml", "ppt/slideLayouts/slideLayout2.xml"),
            "../slideLayouts/slideLayout2.xml"
        );
        assert_eq!(relative_target("ppt/presentation.xml", "ppt/slides/slide1.xml"), "slides/slide1.xml");
    }

    #[test]
    fn test_relationships_round_trip() {
        let xml = r#"<?xml version="1.0"?>
            <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
              <Relationship Id="rId1" Type="http://x/slideMaster" Target="slideMasters/slideMaster1.xml"/>
              <Relationship Id="rId7" Type="http://x/hyperlink" Target="https://example.com" TargetMode="External"/>
            </Relationships>"#;
        let mut rels = Relationships::parse(xml).unwrap();
        assert_eq!(rels.items.len(), 2);
        assert!(rels.get("rId7").unwrap().external);
        assert_eq!(rels.next_id(), "rId8");

        let id = rels.add(REL_SLIDE, "slides/slide1.xml");
        assert_eq!(id, "rId8");

        let reparsed = Relationships::parse(&rels.to_xml()).unwrap();
        assert_eq!(reparsed, rels);
    }

    #[test]
    fn test_content_types_overrides() {
        let xml = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
            <Default Extension="xml" ContentType="application/xml"/>
            <Override PartName="/ppt/slides/slide1.xml" ContentType="old"/>
          </Types>"#;
        let mut types = ContentTypes::parse(xml).unwrap();
        types.remove_override("ppt/slides/slide1.xml");
        types.set_override("ppt/slides/slide2.xml", CT_SLIDE);

        let reparsed = ContentTypes::parse(&types.to_xml()).unwrap();
        assert_eq!(reparsed.defaults.len(), 1);
        assert_eq!(
            reparsed.overrides,
            vec![("/ppt/slides/slide2.xml".to_string(), CT_SLIDE.to_string())]
        );
    }

    #[test]
    fn test_package_round_trip() {
        let mut package = Package::new();
        package.put("ppt/a.xml", "<a/>");
        package.put(CONTENT_TYPES_PART, "<Types/>");
        package.put("ppt/a.xml", "<b/>");

        let reopened = Package::open(&package.to_bytes().unwrap()).unwrap();
        let names: Vec<&str> = reopened.part_names().collect();
        assert_eq!(names, vec![CONTENT_TYPES_PART, "ppt/a.xml"]);
        assert_eq!(reopened.read_string("ppt/a.xml").unwrap(), "<b/>");
    }

    #[test]
    fn test_open_rejects_non_zip() {
        assert!(matches!(Package::open(b"plain text"), Err(Error::ZipError(_))));
    }

    #[test]
    fn test_presentation_part_default() {
        let package = Package::new();
        assert_eq!(package.presentation_part().unwrap(), DEFAULT_PRESENTATION_PART);
    }
}
