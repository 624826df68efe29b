mod common;

use std::sync::Arc;

use common::*;
use pdbook::model::Entry;
use pdbook::{Document, MemorySource, ReadOptions, TextKind, read_document, try_read_document};

fn read(data: &[u8]) -> Document {
    let file = write_temp(data);
    let mut doc = Document::new();
    assert!(read_document(file.path(), &mut doc));
    doc
}

#[test]
fn test_text_records_and_sections() {
    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[
            plucker_index(2),
            plucker_text(2, &[b"Hello", &[0x00, 0x40, b'w', 0x00, 0x48]], 0),
            plucker_text(3, &[b"third"], 1),
        ],
    );
    let doc = read(&data);

    assert_eq!(doc.texts(), vec!["Hello", "w", "third"]);
    assert_eq!(
        doc.paragraphs[1].entries,
        vec![
            Entry::Control {
                kind: TextKind::Emphasis,
                start: true
            },
            Entry::Text("w".into()),
            Entry::Control {
                kind: TextKind::Emphasis,
                start: false
            },
        ]
    );
    assert_eq!(doc.section_count(), 1);
    assert_eq!(doc.labels.get("2"), Some(&0));
    assert_eq!(doc.labels.get("3"), Some(&3));
}

#[test]
fn test_section_breaks_can_be_disabled() {
    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[plucker_index(2), plucker_text(2, &[b"a"], 0), plucker_text(3, &[b"b"], 0)],
    );
    let file = write_temp(&data);
    let mut doc = Document::new();
    let options = ReadOptions::new().with_section_breaks(false);
    try_read_document(file.path(), &mut doc, &options).unwrap();

    assert_eq!(doc.section_count(), 0);
    assert_eq!(doc.texts(), vec!["a", "b"]);
}

#[test]
fn test_images_and_multi_images() {
    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[
            plucker_index(2),
            plucker_image(4, GIF),
            plucker_multi_image(5, 1, 2, &[4, 9]),
            plucker_text(2, &[&[b's', b'e', b'e', 0x00, 0x1A, 0x00, 0x04]], 1),
        ],
    );
    let doc = read(&data);

    let image = doc.image("4").and_then(|i| i.as_record()).unwrap();
    assert_eq!(image.data().unwrap(), GIF);
    assert_eq!(image.media_type(), "image/palm");

    let grid = doc.image("5").and_then(|i| i.as_multi()).unwrap();
    assert_eq!((grid.rows(), grid.columns()), (1, 2));
    assert!(grid.sub_image(0, 0, &doc.images).is_some());
    assert!(grid.sub_image(0, 1, &doc.images).is_none());
    assert!(grid.sub_image(1, 0, &doc.images).is_none());

    assert_eq!(
        doc.paragraphs[0].entries,
        vec![Entry::Text("see".into()), Entry::Image("4".into())]
    );
}

#[test]
fn test_size_mismatch_skips_only_that_record() {
    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[
            plucker_index(2),
            plucker_text_with(2, &[5], 6, true, 1, &zlib(b"Hello")),
            plucker_text(3, &[b"after"], 1),
        ],
    );
    let doc = read(&data);
    assert_eq!(doc.texts(), vec!["after"]);
}

#[test]
fn test_paragraph_table_overrun_keeps_earlier_paragraphs() {
    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[
            plucker_index(2),
            plucker_text(2, &[b"before"], 1),
            plucker_text_with(3, &[3, 10], 6, false, 1, b"onetwo"),
            plucker_text(4, &[b"after"], 1),
        ],
    );
    let doc = read(&data);
    assert_eq!(doc.texts(), vec!["before", "one", "after"]);
}

#[test]
fn test_overstated_paragraph_count_skips_only_that_record() {
    let mut bad = plucker_text(2, &[b"xx"], 1);
    bad[2..4].copy_from_slice(&40u16.to_be_bytes());

    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[plucker_index(2), bad.clone(), plucker_text(3, &[b"third"], 1)],
    );
    let doc = read(&data);
    assert_eq!(doc.texts(), vec!["third"]);

    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[plucker_index(2), plucker_text(3, &[b"first"], 1), bad],
    );
    let doc = read(&data);
    assert_eq!(doc.texts(), vec!["first"]);
}

#[test]
fn test_overstated_multi_image_size_stays_in_record() {
    let mut grid = plucker_multi_image(5, 1, 2, &[4, 9]);
    grid[4..6].copy_from_slice(&400u16.to_be_bytes());

    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[plucker_index(2), grid, plucker_text(2, &[b"after"], 1)],
    );
    let doc = read(&data);

    let grid = doc.image("5").and_then(|i| i.as_multi()).unwrap();
    assert_eq!(grid.ids(), ["4", "9"]);
    assert_eq!(doc.texts(), vec!["after"]);
}

#[test]
fn test_palmdoc_compressed_plucker() {
    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[plucker_index(1), plucker_text_with(2, &[5], 5, true, 1, b"Hello")],
    );
    let doc = read(&data);
    assert_eq!(doc.texts(), vec!["Hello"]);
}

#[test]
fn test_offset_table_divergence_stops_walk() {
    let mut data = pdb(
        "plucker",
        b"DataPlkr",
        &[
            plucker_index(2),
            plucker_text(2, &[b"A"], 1),
            plucker_text(3, &[b"B"], 1),
            plucker_text(4, &[b"C"], 1),
        ],
    );
    // Point record 3 back at record 1: record 2 now ends before it starts.
    let record1 = data[86..90].to_vec();
    data[102..106].copy_from_slice(&record1);

    let doc = read(&data);
    assert_eq!(doc.texts(), vec!["A"]);
}

#[test]
fn test_read_from_memory() {
    let data = pdb(
        "plucker",
        b"DataPlkr",
        &[plucker_index(2), plucker_text(2, &[b"in memory"], 1)],
    );
    let mut doc = Document::new();
    pdbook::read_document_from_source(
        Arc::new(MemorySource::new(data)),
        &mut doc,
        &ReadOptions::default(),
    )
    .unwrap();
    assert_eq!(doc.texts(), vec!["in memory"]);
}
