//! Style seed templates.
//!
//! A seed is an existing `.pptx` used only for its masters, layouts, themes
//! and slide size. Its slides, notes and comments are discarded on load so a
//! composed deck never inherits template content.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tcfd_core::{Error, Result};
use zip::ZipArchive;

use crate::deck::{DEFAULT_SLIDE_HEIGHT, DEFAULT_SLIDE_WIDTH};

/// Part prefixes that carry content rather than style.
const CONTENT_PREFIXES: &[&str] = &[
    "ppt/slides/",
    "ppt/notesSlides/",
    "ppt/notesMasters/",
    "ppt/handoutMasters/",
    "ppt/comments/",
    "ppt/commentAuthors.xml",
    "ppt/embeddings/",
    "ppt/tags/",
];

/// Parts regenerated by the writer.
const REGENERATED_PARTS: &[&str] = &["ppt/presentation.xml", "ppt/_rels/presentation.xml.rels"];

/// Layout picked when none declares itself blank (python-pptx's index 6).
const BLANK_LAYOUT_POSITION: usize = 7;

/// A relationship entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    /// Last path segment of the relationship type URI.
    pub fn kind(&self) -> &str {
        self.rel_type.rsplit('/').next().unwrap_or(&self.rel_type)
    }
}

/// A slide master referenced from the presentation part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRef {
    /// `sldMasterId/@id` from the seed.
    pub id: u32,
    /// Target relative to `ppt/`, e.g. `slideMasters/slideMaster1.xml`.
    pub target: String,
}

/// Style resources extracted from a template package.
#[derive(Debug, Clone)]
pub struct StyleSeed {
    parts: BTreeMap<String, Vec<u8>>,
    masters: Vec<MasterRef>,
    presentation_rels: Vec<Relationship>,
    blank_layout: String,
    slide_size: (i64, i64),
    default_text_style: Option<String>,
    discarded_slides: usize,
}

impl StyleSeed {
    /// Load a seed from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::debug!("Loading style seed {}", path.display());
        Self::from_reader(BufReader::new(file))
    }

    /// Load a seed from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let rels_xml = read_file_from_archive(&mut archive, "ppt/_rels/presentation.xml.rels")?;
        let rels = parse_relationships(&rels_xml)?;
        let presentation_xml = read_file_from_archive(&mut archive, "ppt/presentation.xml")?;
        let info = parse_presentation(&presentation_xml)?;

        let masters: Vec<MasterRef> = info
            .master_ids
            .iter()
            .filter_map(|(id, rid)| {
                rels.iter()
                    .find(|r| &r.id == rid)
                    .map(|r| MasterRef {
                        id: *id,
                        target: r.target.trim_start_matches('/').trim_start_matches("ppt/").to_string(),
                    })
            })
            .collect();
        if masters.is_empty() {
            return Err(Error::Template(
                "style seed declares no slide master".to_string(),
            ));
        }

        let mut parts = BTreeMap::new();
        let mut discarded_slides = 0;
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        for name in names {
            if name.ends_with('/') || !name.starts_with("ppt/") {
                continue;
            }
            if REGENERATED_PARTS.contains(&name.as_str()) {
                continue;
            }
            if CONTENT_PREFIXES.iter().any(|p| name.starts_with(p)) {
                if is_slide_part(&name) {
                    discarded_slides += 1;
                }
                continue;
            }
            if content_type_for(&name).is_none() && !name.ends_with(".rels") {
                log::debug!("Skipping seed part with unknown content type: {}", name);
                continue;
            }
            parts.insert(name.clone(), read_bytes_from_archive(&mut archive, &name)?);
        }

        // Presentation-level relationships that survive: theme and property parts.
        let presentation_rels: Vec<Relationship> = rels
            .into_iter()
            .filter(|r| matches!(r.kind(), "theme" | "presProps" | "viewProps" | "tableStyles"))
            .filter(|r| parts.contains_key(&format!("ppt/{}", r.target.trim_start_matches('/').trim_start_matches("ppt/"))))
            .collect();

        let blank_layout = pick_blank_layout(&parts)?;
        if discarded_slides > 0 {
            log::info!(
                "Discarding {} baseline slide(s) from style seed",
                discarded_slides
            );
        }

        Ok(Self {
            parts,
            masters,
            presentation_rels,
            blank_layout,
            slide_size: info.slide_size.unwrap_or((DEFAULT_SLIDE_WIDTH, DEFAULT_SLIDE_HEIGHT)),
            default_text_style: info.default_text_style,
            discarded_slides,
        })
    }

    /// Retained parts keyed by package path.
    pub fn parts(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.parts
    }

    pub fn masters(&self) -> &[MasterRef] {
        &self.masters
    }

    /// Theme and property relationships of the presentation part.
    pub fn presentation_rels(&self) -> &[Relationship] {
        &self.presentation_rels
    }

    /// Layout new slides are based on, relative to `ppt/`.
    pub fn blank_layout(&self) -> &str {
        &self.blank_layout
    }

    /// Slide size in EMU.
    pub fn slide_size(&self) -> (i64, i64) {
        self.slide_size
    }

    /// Raw `p:defaultTextStyle` element, if the seed had one.
    pub fn default_text_style(&self) -> Option<&str> {
        self.default_text_style.as_deref()
    }

    /// How many baseline slides were dropped.
    pub fn discarded_slides(&self) -> usize {
        self.discarded_slides
    }
}

/// Content type for a package part, by location and extension.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    if ext == "xml" {
        let ct = if name.starts_with("ppt/slideMasters/") {
            "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"
        } else if name.starts_with("ppt/slideLayouts/") {
            "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"
        } else if name.starts_with("ppt/slides/") {
            "application/vnd.openxmlformats-officedocument.presentationml.slide+xml"
        } else if name.starts_with("ppt/theme/") {
            "application/vnd.openxmlformats-officedocument.theme+xml"
        } else if name == "ppt/presentation.xml" {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"
        } else if name == "ppt/presProps.xml" {
            "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"
        } else if name == "ppt/viewProps.xml" {
            "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml"
        } else if name == "ppt/tableStyles.xml" {
            "application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml"
        } else if name == "docProps/core.xml" {
            "application/vnd.openxmlformats-package.core-properties+xml"
        } else if name == "docProps/app.xml" {
            "application/vnd.openxmlformats-officedocument.extended-properties+xml"
        } else {
            return None;
        };
        return Some(ct);
    }
    media_type_for(&ext)
}

/// Default content type for a media extension.
pub fn media_type_for(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some("image/png"),
        "jpeg" | "jpg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "emf" => Some("image/x-emf"),
        "wmf" => Some("image/x-wmf"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn is_slide_part(name: &str) -> bool {
    name.starts_with("ppt/slides/slide") && name.ends_with(".xml")
}

/// Choose the layout new slides use: a `type="blank"` layout, else the
/// seventh, else the last.
fn pick_blank_layout(parts: &BTreeMap<String, Vec<u8>>) -> Result<String> {
    let mut layouts: Vec<(&String, Option<usize>)> = parts
        .keys()
        .filter(|name| name.starts_with("ppt/slideLayouts/slideLayout") && name.ends_with(".xml"))
        .map(|name| (name, extract_part_number(name)))
        .collect();
    layouts.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(b.0),
    });

    for (name, _) in &layouts {
        let xml = String::from_utf8_lossy(&parts[*name]);
        if layout_type(&xml).as_deref() == Some("blank") {
            return Ok(strip_ppt_prefix(name));
        }
    }

    layouts
        .get(BLANK_LAYOUT_POSITION - 1)
        .or_else(|| layouts.last())
        .map(|(name, _)| strip_ppt_prefix(name))
        .ok_or_else(|| Error::Template("style seed has no slide layouts".to_string()))
}

fn strip_ppt_prefix(name: &str) -> String {
    name.trim_start_matches("ppt/").to_string()
}

/// The `type` attribute of a layout's root element.
fn layout_type(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"sldLayout" =>
            {
                return e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"type")
                    .map(|a| String::from_utf8_lossy(&a.value).to_string());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Parse every `Relationship` element of a `.rels` part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

#[derive(Debug, Default)]
struct PresentationInfo {
    master_ids: Vec<(u32, String)>,
    slide_size: Option<(i64, i64)>,
    default_text_style: Option<String>,
}

fn parse_presentation(xml: &str) -> Result<PresentationInfo> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut info = PresentationInfo::default();

    loop {
        match reader.read_event() {
            Ok(event @ Event::Empty(_)) | Ok(event @ Event::Start(_)) => {
                let is_start = matches!(event, Event::Start(_));
                let e = match &event {
                    Event::Start(e) | Event::Empty(e) => e,
                    _ => continue,
                };
                match local_name(e.name().as_ref()) {
                    b"sldMasterId" => {
                        let mut id = None;
                        let mut rid = None;
                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match attr.key.as_ref() {
                                b"id" => id = value.parse::<u32>().ok(),
                                b"r:id" => rid = Some(value),
                                _ => {}
                            }
                        }
                        if let (Some(id), Some(rid)) = (id, rid) {
                            info.master_ids.push((id, rid));
                        }
                    }
                    b"sldSz" => {
                        let mut cx = None;
                        let mut cy = None;
                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8_lossy(&attr.value).parse::<i64>().ok();
                            match attr.key.as_ref() {
                                b"cx" => cx = value,
                                b"cy" => cy = value,
                                _ => {}
                            }
                        }
                        if let (Some(cx), Some(cy)) = (cx, cy) {
                            info.slide_size = Some((cx, cy));
                        }
                    }
                    b"defaultTextStyle" if is_start => {
                        let name = e.name().as_ref().to_vec();
                        let inner = reader
                            .read_text(quick_xml::name::QName(&name))
                            .map_err(|e| Error::XmlError(format!("Error reading text styles: {}", e)))?;
                        let tag = String::from_utf8_lossy(&name).to_string();
                        info.default_text_style = Some(format!("<{tag}>{inner}</{tag}>"));
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation part: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(info)
}

fn read_file_from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let bytes = read_bytes_from_archive(archive, path)?;
    String::from_utf8(bytes).map_err(|e| Error::ZipError(format!("'{}' is not UTF-8: {}", path, e)))
}

fn read_bytes_from_archive<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a trailing part number from a string like "rId2" or "slideLayout7.xml".
pub(crate) fn extract_part_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".rels").trim_end_matches(".xml");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_part_number() {
        assert_eq!(extract_part_number("rId1"), Some(1));
        assert_eq!(extract_part_number("rId12"), Some(12));
        assert_eq!(extract_part_number("ppt/slideLayouts/slideLayout7.xml"), Some(7));
        assert_eq!(extract_part_number("slideLayout11.xml.rels"), Some(11));
        assert_eq!(extract_part_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sldLayout"), b"sldLayout");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
</Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].kind(), "slideMaster");
        assert_eq!(rels[1].target, "theme/theme1.xml");
    }

    #[test]
    fn test_parse_presentation() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r" xmlns:a="a">
  <p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
  <p:sldIdLst><p:sldId id="256" r:id="rId5"/></p:sldIdLst>
  <p:sldSz cx="9144000" cy="6858000"/>
  <p:defaultTextStyle><a:lvl1pPr marL="0"/></p:defaultTextStyle>
</p:presentation>"#;
        let info = parse_presentation(xml).unwrap();
        assert_eq!(info.master_ids, vec![(2147483648, "rId1".to_string())]);
        assert_eq!(info.slide_size, Some((9144000, 6858000)));
        assert_eq!(
            info.default_text_style.as_deref(),
            Some(r#"<p:defaultTextStyle><a:lvl1pPr marL="0"/></p:defaultTextStyle>"#)
        );
    }

    #[test]
    fn test_layout_type() {
        assert_eq!(
            layout_type(r#"<p:sldLayout xmlns:p="p" type="blank" preserve="1"><p:cSld/></p:sldLayout>"#),
            Some("blank".to_string())
        );
        assert_eq!(layout_type(r#"<p:sldLayout xmlns:p="p"><p:cSld/></p:sldLayout>"#), None);
    }

    #[test]
    fn test_content_types() {
        assert!(content_type_for("ppt/slideLayouts/slideLayout1.xml")
            .unwrap()
            .ends_with("slideLayout+xml"));
        assert_eq!(content_type_for("ppt/media/image1.PNG"), Some("image/png"));
        assert_eq!(content_type_for("ppt/tags/tag1.xml"), None);
        assert_eq!(content_type_for("ppt/media/clip.mp4"), None);
    }
}
