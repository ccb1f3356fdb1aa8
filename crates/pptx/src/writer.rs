//! PPTX package writer.
//!
//! Serialises a [`Deck`] into an Office Open XML package. Output is
//! byte-stable for a given deck: parts are emitted in sorted order with a
//! fixed archive timestamp and no document dates.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Seek, Write};
use tcfd_core::{Error, Result};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::deck::{Deck, Shape, Slide};
use crate::defaults;
use crate::grid::{Align, Anchor, Cell, Grid, Merge, FONT_FACE};
use crate::seed::{content_type_for, media_type_for};

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

/// First `sldId/@id` PowerPoint accepts.
const FIRST_SLIDE_ID: u32 = 256;

/// Writes decks as `.pptx` packages.
#[derive(Debug, Clone)]
pub struct PptxWriter {
    title: String,
    application: String,
}

impl PptxWriter {
    /// Create a writer with default document properties.
    pub fn new() -> Self {
        Self {
            title: "TCFD Report".to_string(),
            application: "tcfd-report".to_string(),
        }
    }

    /// Set the document title stored in `docProps/core.xml`.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Serialise a deck into memory.
    pub fn to_bytes(&self, deck: &Deck) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write(deck, &mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Serialise a deck into any seekable sink.
    pub fn write<W: Write + Seek>(&self, deck: &Deck, sink: W) -> Result<()> {
        let parts = self.build_parts(deck)?;
        log::debug!(
            "Writing package with {} part(s) and {} slide(s)",
            parts.len(),
            deck.slide_count()
        );

        let mut zip = ZipWriter::new(sink);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        // The content types part goes first, then everything else in order.
        let (types_name, types_body) = content_types(&parts)?;
        for (name, body) in std::iter::once((&types_name, &types_body)).chain(parts.iter()) {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", name, e)))?;
            zip.write_all(body)?;
        }
        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))?;
        Ok(())
    }

    fn build_parts(&self, deck: &Deck) -> Result<BTreeMap<String, Vec<u8>>> {
        let mut parts: BTreeMap<String, Vec<u8>> = BTreeMap::new();

        // Presentation relationships: masters, style parts, then slides.
        let mut rels: Vec<(String, String, String)> = Vec::new();
        let mut master_ids: Vec<(u32, String)> = Vec::new();
        let layout_target;
        let default_text_style;

        match deck.seed() {
            Some(seed) => {
                for (name, body) in seed.parts() {
                    parts.insert(name.clone(), body.clone());
                }
                for master in seed.masters() {
                    let rid = format!("rId{}", rels.len() + 1);
                    rels.push((rid.clone(), rel_type("slideMaster"), master.target.clone()));
                    master_ids.push((master.id, rid));
                }
                for rel in seed.presentation_rels() {
                    let rid = format!("rId{}", rels.len() + 1);
                    rels.push((rid, rel.rel_type.clone(), rel.target.clone()));
                }
                layout_target = seed.blank_layout().to_string();
                default_text_style = seed.default_text_style().map(str::to_string);
            }
            None => {
                parts.insert(defaults::MASTER_PATH.to_string(), defaults::master_xml().into_bytes());
                parts.insert(
                    defaults::MASTER_RELS_PATH.to_string(),
                    defaults::master_rels_xml().into_bytes(),
                );
                parts.insert(defaults::LAYOUT_PATH.to_string(), defaults::layout_xml().into_bytes());
                parts.insert(
                    defaults::LAYOUT_RELS_PATH.to_string(),
                    defaults::layout_rels_xml().into_bytes(),
                );
                parts.insert(defaults::THEME_PATH.to_string(), defaults::theme_xml().into_bytes());
                parts.insert("ppt/presProps.xml".to_string(), defaults::pres_props_xml().into_bytes());
                parts.insert(
                    "ppt/tableStyles.xml".to_string(),
                    defaults::table_styles_xml().into_bytes(),
                );

                rels.push(("rId1".to_string(), rel_type("slideMaster"), "slideMasters/slideMaster1.xml".to_string()));
                master_ids.push((defaults::MASTER_ID, "rId1".to_string()));
                rels.push(("rId2".to_string(), rel_type("theme"), "theme/theme1.xml".to_string()));
                rels.push(("rId3".to_string(), rel_type("presProps"), "presProps.xml".to_string()));
                rels.push(("rId4".to_string(), rel_type("tableStyles"), "tableStyles.xml".to_string()));
                layout_target = "slideLayouts/slideLayout1.xml".to_string();
                default_text_style = None;
            }
        }

        let mut slide_ids = Vec::with_capacity(deck.slide_count());
        for (index, slide) in deck.slides().iter().enumerate() {
            let number = index + 1;
            let rid = format!("rId{}", rels.len() + 1);
            rels.push((rid.clone(), rel_type("slide"), format!("slides/slide{}.xml", number)));
            slide_ids.push((FIRST_SLIDE_ID + index as u32, rid));

            parts.insert(format!("ppt/slides/slide{}.xml", number), slide_xml(slide)?);
            parts.insert(
                format!("ppt/slides/_rels/slide{}.xml.rels", number),
                relationships_xml(&[(
                    "rId1".to_string(),
                    rel_type("slideLayout"),
                    format!("../{}", layout_target),
                )])?,
            );
        }

        parts.insert(
            "ppt/presentation.xml".to_string(),
            presentation_xml(
                &master_ids,
                &slide_ids,
                (deck.slide_width(), deck.slide_height()),
                default_text_style.as_deref(),
            )?,
        );
        parts.insert("ppt/_rels/presentation.xml.rels".to_string(), relationships_xml(&rels)?);
        parts.insert(
            "_rels/.rels".to_string(),
            relationships_xml(&[
                (
                    "rId1".to_string(),
                    rel_type("officeDocument"),
                    "ppt/presentation.xml".to_string(),
                ),
                (
                    "rId2".to_string(),
                    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties".to_string(),
                    "docProps/core.xml".to_string(),
                ),
                (
                    "rId3".to_string(),
                    rel_type("extended-properties"),
                    "docProps/app.xml".to_string(),
                ),
            ])?,
        );
        parts.insert("docProps/core.xml".to_string(), core_props_xml(&self.title)?);
        parts.insert(
            "docProps/app.xml".to_string(),
            app_props_xml(&self.application, deck.slide_count())?,
        );

        Ok(parts)
    }
}

impl Default for PptxWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn rel_type(kind: &str) -> String {
    format!("{}/{}", REL_BASE, kind)
}

/// Thin wrapper over the quick-xml writer with crate errors.
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Result<Self> {
        let mut out = Self {
            writer: Writer::new(Vec::new()),
        };
        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(out)
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlError(format!("Failed to write XML: {}", e)))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.event(Event::Start(elem))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.event(Event::Empty(elem))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(text)))
    }

    /// Write pre-escaped markup as-is.
    fn raw(&mut self, markup: &str) -> Result<()> {
        self.event(Event::Text(BytesText::from_escaped(markup)))
    }

    fn element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name, &[])?;
        self.text(text)?;
        self.end(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn content_types(parts: &BTreeMap<String, Vec<u8>>) -> Result<(String, Vec<u8>)> {
    let mut extensions = BTreeSet::new();
    for name in parts.keys() {
        if let Some(ext) = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
            if media_type_for(&ext).is_some() {
                extensions.insert(ext);
            }
        }
    }

    let mut out = XmlOut::new()?;
    out.start(
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    out.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    out.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for ext in &extensions {
        if let Some(ct) = media_type_for(ext) {
            out.empty("Default", &[("Extension", ext), ("ContentType", ct)])?;
        }
    }
    for name in parts.keys() {
        if !name.ends_with(".xml") {
            continue;
        }
        if let Some(ct) = content_type_for(name) {
            let part_name = format!("/{}", name);
            out.empty("Override", &[("PartName", &part_name), ("ContentType", ct)])?;
        }
    }
    out.end("Types")?;
    Ok(("[Content_Types].xml".to_string(), out.finish()))
}

fn relationships_xml(rels: &[(String, String, String)]) -> Result<Vec<u8>> {
    let mut out = XmlOut::new()?;
    out.start("Relationships", &[("xmlns", NS_RELS)])?;
    for (id, rel_type, target) in rels {
        out.empty(
            "Relationship",
            &[("Id", id), ("Type", rel_type), ("Target", target)],
        )?;
    }
    out.end("Relationships")?;
    Ok(out.finish())
}

fn presentation_xml(
    masters: &[(u32, String)],
    slides: &[(u32, String)],
    size: (i64, i64),
    default_text_style: Option<&str>,
) -> Result<Vec<u8>> {
    let mut out = XmlOut::new()?;
    out.start(
        "p:presentation",
        &[
            ("xmlns:a", NS_A),
            ("xmlns:r", NS_R),
            ("xmlns:p", NS_P),
            ("saveSubsetFonts", "1"),
        ],
    )?;

    out.start("p:sldMasterIdLst", &[])?;
    for (id, rid) in masters {
        out.empty("p:sldMasterId", &[("id", &id.to_string()), ("r:id", rid)])?;
    }
    out.end("p:sldMasterIdLst")?;

    if !slides.is_empty() {
        out.start("p:sldIdLst", &[])?;
        for (id, rid) in slides {
            out.empty("p:sldId", &[("id", &id.to_string()), ("r:id", rid)])?;
        }
        out.end("p:sldIdLst")?;
    }

    out.empty(
        "p:sldSz",
        &[("cx", &size.0.to_string()), ("cy", &size.1.to_string())],
    )?;
    out.empty("p:notesSz", &[("cx", "6858000"), ("cy", "9144000")])?;
    if let Some(style) = default_text_style {
        out.raw(style)?;
    }
    out.end("p:presentation")?;
    Ok(out.finish())
}

fn core_props_xml(title: &str) -> Result<Vec<u8>> {
    let mut out = XmlOut::new()?;
    out.start(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
        ],
    )?;
    out.element("dc:title", title)?;
    out.element("dc:creator", "tcfd-report")?;
    out.end("cp:coreProperties")?;
    Ok(out.finish())
}

fn app_props_xml(application: &str, slides: usize) -> Result<Vec<u8>> {
    let mut out = XmlOut::new()?;
    out.start(
        "Properties",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
        )],
    )?;
    out.element("Application", application)?;
    out.element("Slides", &slides.to_string())?;
    out.end("Properties")?;
    Ok(out.finish())
}

fn slide_xml(slide: &Slide) -> Result<Vec<u8>> {
    let mut out = XmlOut::new()?;
    out.start("p:sld", &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)])?;
    out.start("p:cSld", &[])?;
    out.start("p:spTree", &[])?;

    out.start("p:nvGrpSpPr", &[])?;
    out.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    out.empty("p:cNvGrpSpPr", &[])?;
    out.empty("p:nvPr", &[])?;
    out.end("p:nvGrpSpPr")?;
    out.start("p:grpSpPr", &[])?;
    out.start("a:xfrm", &[])?;
    out.empty("a:off", &[("x", "0"), ("y", "0")])?;
    out.empty("a:ext", &[("cx", "0"), ("cy", "0")])?;
    out.empty("a:chOff", &[("x", "0"), ("y", "0")])?;
    out.empty("a:chExt", &[("cx", "0"), ("cy", "0")])?;
    out.end("a:xfrm")?;
    out.end("p:grpSpPr")?;

    for (index, shape) in slide.shapes().iter().enumerate() {
        match shape {
            Shape::Table(grid) => write_table(&mut out, grid, index + 2)?,
        }
    }

    out.end("p:spTree")?;
    out.end("p:cSld")?;
    out.start("p:clrMapOvr", &[])?;
    out.empty("a:masterClrMapping", &[])?;
    out.end("p:clrMapOvr")?;
    out.end("p:sld")?;
    Ok(out.finish())
}

fn write_table(out: &mut XmlOut, grid: &Grid, shape_id: usize) -> Result<()> {
    let (x, y) = grid.position();
    let (cx, cy) = grid.extent();
    let name = format!("Table {}", shape_id - 1);

    out.start("p:graphicFrame", &[])?;
    out.start("p:nvGraphicFramePr", &[])?;
    out.empty("p:cNvPr", &[("id", &shape_id.to_string()), ("name", &name)])?;
    out.start("p:cNvGraphicFramePr", &[])?;
    out.empty("a:graphicFrameLocks", &[("noGrp", "1")])?;
    out.end("p:cNvGraphicFramePr")?;
    out.empty("p:nvPr", &[])?;
    out.end("p:nvGraphicFramePr")?;

    out.start("p:xfrm", &[])?;
    out.empty("a:off", &[("x", &x.to_string()), ("y", &y.to_string())])?;
    out.empty("a:ext", &[("cx", &cx.to_string()), ("cy", &cy.to_string())])?;
    out.end("p:xfrm")?;

    out.start("a:graphic", &[])?;
    out.start("a:graphicData", &[("uri", TABLE_URI)])?;
    out.start("a:tbl", &[])?;
    out.empty("a:tblPr", &[])?;
    out.start("a:tblGrid", &[])?;
    for width in grid.col_widths() {
        out.empty("a:gridCol", &[("w", &width.to_string())])?;
    }
    out.end("a:tblGrid")?;

    for (r, height) in grid.row_heights().iter().enumerate() {
        out.start("a:tr", &[("h", &height.to_string())])?;
        if let Some(cells) = grid.row(r) {
            for cell in cells {
                write_cell(out, cell)?;
            }
        }
        out.end("a:tr")?;
    }

    out.end("a:tbl")?;
    out.end("a:graphicData")?;
    out.end("a:graphic")?;
    out.end("p:graphicFrame")
}

fn write_cell(out: &mut XmlOut, cell: &Cell) -> Result<()> {
    let row_span;
    let col_span;
    let mut attrs: Vec<(&str, &str)> = Vec::new();
    match cell.merge() {
        Merge::None => {}
        Merge::Origin {
            row_span: rows,
            col_span: cols,
        } => {
            row_span = rows.to_string();
            col_span = cols.to_string();
            if cols > 1 {
                attrs.push(("gridSpan", &col_span));
            }
            if rows > 1 {
                attrs.push(("rowSpan", &row_span));
            }
        }
        Merge::Covered {
            horizontal,
            vertical,
        } => {
            if horizontal {
                attrs.push(("hMerge", "1"));
            }
            if vertical {
                attrs.push(("vMerge", "1"));
            }
        }
    }
    out.start("a:tc", &attrs)?;

    let style = cell.style();
    let size = (style.size * 100).to_string();
    let color = style.color.hex();
    let algn = match style.align {
        Align::Left => "l",
        Align::Center => "ctr",
        Align::Right => "r",
    };

    out.start("a:txBody", &[])?;
    out.empty("a:bodyPr", &[])?;
    out.empty("a:lstStyle", &[])?;
    for line in cell.text().split('\n') {
        out.start("a:p", &[])?;
        out.empty("a:pPr", &[("algn", algn)])?;
        if line.is_empty() {
            out.empty("a:endParaRPr", &[("lang", "en-US"), ("sz", &size)])?;
        } else {
            out.start("a:r", &[])?;
            let mut rpr: Vec<(&str, &str)> = vec![("lang", "en-US"), ("sz", &size)];
            if style.bold {
                rpr.push(("b", "1"));
            }
            rpr.push(("dirty", "0"));
            out.start("a:rPr", &rpr)?;
            out.start("a:solidFill", &[])?;
            out.empty("a:srgbClr", &[("val", &color)])?;
            out.end("a:solidFill")?;
            out.empty("a:latin", &[("typeface", FONT_FACE)])?;
            out.empty("a:ea", &[("typeface", FONT_FACE)])?;
            out.empty("a:cs", &[("typeface", FONT_FACE)])?;
            out.end("a:rPr")?;
            out.element("a:t", line)?;
            out.end("a:r")?;
        }
        out.end("a:p")?;
    }
    out.end("a:txBody")?;

    let anchor = match cell.anchor() {
        Anchor::Top => "t",
        Anchor::Middle => "ctr",
        Anchor::Bottom => "b",
    };
    out.start("a:tcPr", &[("anchor", anchor)])?;
    if !cell.has_borders() {
        for edge in ["a:lnL", "a:lnR", "a:lnT", "a:lnB"] {
            out.start(edge, &[("w", "0")])?;
            out.empty("a:noFill", &[])?;
            out.end(edge)?;
        }
    }
    if let Some(fill) = cell.fill() {
        out.start("a:solidFill", &[])?;
        out.empty("a:srgbClr", &[("val", &fill.hex())])?;
        out.end("a:solidFill")?;
    }
    out.end("a:tcPr")?;
    out.end("a:tc")
}
