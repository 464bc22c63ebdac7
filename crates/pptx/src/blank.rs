//! A minimal presentation package used when no template is given.
//!
//! One master, one "Blank" layout without placeholders and a default
//! theme; slides get text boxes at the default geometry.

use crate::package::{
    ContentTypes, Package, Relationships, CONTENT_TYPES_PART, REL_OFFICE_DOCUMENT, REL_SLIDE_LAYOUT,
    REL_SLIDE_MASTER, REL_THEME,
};
use deck_core::PageSize;

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree>"#;

/// Build the empty package for a page of the given size.
pub fn blank_package(page: PageSize) -> Package {
    let mut package = Package::new();

    let mut types = ContentTypes::default();
    types.defaults.push((
        "rels".into(),
        "application/vnd.openxmlformats-package.relationships+xml".into(),
    ));
    types.defaults.push(("xml".into(), "application/xml".into()));
    types.set_override(
        "ppt/presentation.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
    );
    types.set_override(
        "ppt/slideMasters/slideMaster1.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
    );
    types.set_override(
        "ppt/slideLayouts/slideLayout1.xml",
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
    );
    types.set_override(
        "ppt/theme/theme1.xml",
        "application/vnd.openxmlformats-officedocument.theme+xml",
    );
    package.put(CONTENT_TYPES_PART, types.to_xml());

    let mut root = Relationships::default();
    root.add(REL_OFFICE_DOCUMENT, "ppt/presentation.xml");
    package.put("_rels/.rels", root.to_xml());

    package.put(
        "ppt/presentation.xml",
        format!(
            "{}<p:presentation {} saveSubsetFonts=\"1\"><p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst><p:sldSz cx=\"{}\" cy=\"{}\"/><p:notesSz cx=\"{}\" cy=\"{}\"/></p:presentation>",
            XML_DECL, NAMESPACES, page.width, page.height, page.height, page.width
        ),
    );
    let mut presentation_rels = Relationships::default();
    presentation_rels.add(REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml");
    presentation_rels.add(REL_THEME, "theme/theme1.xml");
    package.put("ppt/_rels/presentation.xml.rels", presentation_rels.to_xml());

    package.put(
        "ppt/slideMasters/slideMaster1.xml",
        format!(
            "{}<p:sldMaster {}><p:cSld><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>{}</p:cSld><p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/><p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst></p:sldMaster>",
            XML_DECL, NAMESPACES, EMPTY_TREE
        ),
    );
    let mut master_rels = Relationships::default();
    master_rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
    master_rels.add(REL_THEME, "../theme/theme1.xml");
    package.put("ppt/slideMasters/_rels/slideMaster1.xml.rels", master_rels.to_xml());

    package.put(
        "ppt/slideLayouts/slideLayout1.xml",
        format!(
            "{}<p:sldLayout {} type=\"blank\" preserve=\"1\"><p:cSld name=\"Blank\">{}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>",
            XML_DECL, NAMESPACES, EMPTY_TREE
        ),
    );
    let mut layout_rels = Relationships::default();
    layout_rels.add(REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml");
    package.put("ppt/slideLayouts/_rels/slideLayout1.xml.rels", layout_rels.to_xml());

    package.put("ppt/theme/theme1.xml", format!("{}{}", XML_DECL, THEME));

    package
}

const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#;
