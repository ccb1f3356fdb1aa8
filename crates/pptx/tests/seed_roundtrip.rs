use std::fs::File;
use std::io::{Cursor, Read, Write};
use tcfd_pptx::{init_grid, Deck, PptxWriter, StyleSeed};
use zip::ZipArchive;

fn deck_with_slides(count: usize) -> Deck {
    let mut deck = Deck::new();
    for i in 0..count {
        let slide = deck.add_slide();
        let grid = init_grid(slide, 1, 1, &[3.0]).unwrap();
        grid.set_text(0, 0, &format!("baseline {}", i)).unwrap();
    }
    deck
}

fn part_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[test]
fn test_seed_drops_baseline_slides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.pptx");
    let bytes = PptxWriter::new().to_bytes(&deck_with_slides(3)).unwrap();
    File::create(&path).unwrap().write_all(&bytes).unwrap();

    let seed = StyleSeed::open(&path).unwrap();
    assert_eq!(seed.discarded_slides(), 3);
    assert_eq!(seed.blank_layout(), "slideLayouts/slideLayout1.xml");
    assert_eq!(seed.slide_size(), (12_192_000, 6_858_000));
    assert!(seed.parts().keys().all(|name| !name.starts_with("ppt/slides/")));
}

#[test]
fn test_seeded_deck_contains_only_new_slides() {
    let bytes = PptxWriter::new().to_bytes(&deck_with_slides(2)).unwrap();
    let seed = StyleSeed::from_reader(Cursor::new(bytes)).unwrap();

    let mut deck = Deck::from_seed(seed);
    let slide = deck.add_slide();
    init_grid(slide, 1, 1, &[3.0]).unwrap().set_text(0, 0, "fresh").unwrap();

    let out = PptxWriter::new().to_bytes(&deck).unwrap();
    let names = part_names(&out);
    assert!(names.contains(&"ppt/slides/slide1.xml".to_string()));
    assert!(!names.contains(&"ppt/slides/slide2.xml".to_string()));
    assert!(names.contains(&"ppt/theme/theme1.xml".to_string()));

    let mut archive = ZipArchive::new(Cursor::new(out)).unwrap();
    let mut slide_xml = String::new();
    archive
        .by_name("ppt/slides/slide1.xml")
        .unwrap()
        .read_to_string(&mut slide_xml)
        .unwrap();
    assert!(slide_xml.contains("fresh"));
    assert!(!slide_xml.contains("baseline"));
}

#[test]
fn test_seed_without_master_is_rejected() {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = zip::write::FileOptions::default();
        zip.start_file("ppt/presentation.xml", options).unwrap();
        zip.write_all(br#"<p:presentation xmlns:p="p"/>"#).unwrap();
        zip.start_file("ppt/_rels/presentation.xml.rels", options).unwrap();
        zip.write_all(br#"<Relationships xmlns="r"/>"#).unwrap();
        zip.finish().unwrap();
    }
    buffer.set_position(0);
    assert!(StyleSeed::from_reader(buffer).is_err());
}

#[test]
fn test_missing_seed_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StyleSeed::open(dir.path().join("absent.pptx")).unwrap_err();
    assert!(matches!(err, tcfd_core::Error::IoError(_)));
}
