mod common;

use common::*;
use pdbook::model::Entry;
use pdbook::{
    Document, Error, FailureReason, ReadOptions, TextKind, read_document, try_read_document,
};

fn try_read(data: &[u8], options: &ReadOptions) -> (Document, pdbook::Result<()>) {
    let file = write_temp(data);
    let mut doc = Document::new();
    let result = try_read_document(file.path(), &mut doc, options);
    (doc, result)
}

fn read(data: &[u8]) -> Document {
    let (doc, result) = try_read(data, &ReadOptions::default());
    result.unwrap();
    doc
}

#[test]
fn test_palmdoc_lines() {
    let data = pdb(
        "doc",
        b"TEXtREAd",
        &[
            palmdoc_record0(1, 2, 4096),
            b"line one\nline".to_vec(),
            b" two\n".to_vec(),
        ],
    );
    let doc = read(&data);
    assert_eq!(doc.texts(), vec!["line one", "line two"]);
}

#[test]
fn test_type_tag_is_case_insensitive() {
    let data = pdb("doc", b"textread", &[palmdoc_record0(1, 1, 64), b"ok".to_vec()]);
    assert_eq!(read(&data).texts(), vec!["ok"]);
}

#[test]
fn test_palmdoc_compressed_text() {
    // "abc" then a back-reference of distance 3, length 3.
    let data = pdb(
        "doc",
        b"TEXtREAd",
        &[palmdoc_record0(2, 1, 4096), vec![b'a', b'b', b'c', 0x80, 0x18]],
    );
    assert_eq!(read(&data).texts(), vec!["abcabc"]);
}

#[test]
fn test_mobipocket_markup_and_images() {
    let data = pdb(
        "mobi",
        b"BOOKMOBI",
        &[
            mobi_record0(1, 2, 4096, 3, 0),
            b"<p>Hello <b>world</b></p><mbp:pagebreak/>".to_vec(),
            b"<h1>Two</h1><p><img recindex=\"00001\"></p>".to_vec(),
            GIF.to_vec(),
            b"FLIS0000".to_vec(),
            JPEG.to_vec(),
        ],
    );
    let doc = read(&data);

    assert_eq!(doc.texts()[..2], ["Hello world", "Two"]);
    assert_eq!(
        doc.paragraphs[0].entries,
        vec![
            Entry::Text("Hello".into()),
            Entry::Control {
                kind: TextKind::Strong,
                start: true
            },
            Entry::Text(" world".into()),
            Entry::Control {
                kind: TextKind::Strong,
                start: false
            },
        ]
    );
    assert_eq!(doc.section_count(), 1);
    assert_eq!(doc.titles.len(), 1);
    assert_eq!(doc.titles[0], "Two");

    let image_paragraph = doc.text_paragraphs().last().unwrap();
    assert_eq!(image_paragraph.entries, vec![Entry::Image("1".into())]);

    let gif = doc.image("1").and_then(|i| i.as_record()).unwrap();
    assert_eq!(gif.media_type(), "image/gif");
    assert_eq!(gif.data().unwrap(), GIF);
    assert!(doc.image("2").is_none());
    let jpeg = doc.image("3").and_then(|i| i.as_record()).unwrap();
    assert_eq!(jpeg.media_type(), "image/jpeg");
}

#[test]
fn test_image_records_are_sniffed_without_index() {
    let records = [
        mobi_record0(1, 1, 4096, NULL_INDEX, 0),
        b"<p>text</p>".to_vec(),
        b"FLIS0000".to_vec(),
        GIF.to_vec(),
    ];
    let doc = read(&pdb("mobi", b"BOOKMOBI", &records));
    let gif = doc.image("1").and_then(|i| i.as_record()).unwrap();
    assert_eq!(gif.data().unwrap(), GIF);

    let options = ReadOptions::new().with_sniff_images(false);
    let (doc, result) = try_read(&pdb("mobi", b"BOOKMOBI", &records), &options);
    result.unwrap();
    assert!(doc.images.is_empty());
}

#[test]
fn test_markup_can_be_read_as_plain_text() {
    let data = pdb(
        "mobi",
        b"BOOKMOBI",
        &[mobi_record0(1, 1, 4096, NULL_INDEX, 0), b"<b>raw</b>".to_vec()],
    );
    let options = ReadOptions::new().with_mobi_markup(false);
    let (doc, result) = try_read(&data, &options);
    result.unwrap();
    assert_eq!(doc.texts(), vec!["<b>raw</b>"]);
}

#[test]
fn test_trailing_entries_are_stripped() {
    let data = pdb(
        "mobi",
        b"BOOKMOBI",
        &[
            mobi_record0(1, 1, 4096, NULL_INDEX, 0b10),
            b"<p>abc</p>\xAA\xBB\x83".to_vec(),
        ],
    );
    assert_eq!(read(&data).texts(), vec!["abc"]);
}

#[test]
fn test_encrypted_mobipocket_is_rejected() {
    let mut record0 = mobi_record0(2, 1, 4096, NULL_INDEX, 0);
    record0[12..14].copy_from_slice(&2u16.to_be_bytes());
    let data = pdb("mobi", b"BOOKMOBI", &[record0.clone(), b"secret".to_vec()]);

    let (doc, result) = try_read(&data, &ReadOptions::default());
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Encrypted));
    assert_eq!(err.user_message(), FailureReason::EncryptedFile);
    assert!(doc.paragraphs.is_empty());

    let file = write_temp(&data);
    assert!(!read_document(file.path(), &mut Document::new()));

    // PalmDoc record 0 has no encryption field.
    let data = pdb("doc", b"TEXtREAd", &[record0, b"open".to_vec()]);
    let (_, result) = try_read(&data, &ReadOptions::default());
    assert!(result.is_ok());
}

#[test]
fn test_unknown_compression_is_rejected() {
    let data = pdb("doc", b"TEXtREAd", &[palmdoc_record0(9, 1, 4096), b"x".to_vec()]);
    let (_, result) = try_read(&data, &ReadOptions::default());
    let err = result.unwrap_err();
    assert!(matches!(err, Error::UnsupportedCompression(_)));
    assert_eq!(err.user_message(), FailureReason::UnsupportedCompression);
}

#[test]
fn test_huffman_dictionary_outside_table() {
    let mut record0 = mobi_record0(0x4448, 1, 4096, NULL_INDEX, 0);
    record0[0x70..0x74].copy_from_slice(&2u32.to_be_bytes());
    record0[0x74..0x78].copy_from_slice(&4u32.to_be_bytes());
    let data = pdb("mobi", b"BOOKMOBI", &[record0, vec![0xFF], b"HUFF".to_vec()]);

    let (_, result) = try_read(&data, &ReadOptions::default());
    assert!(matches!(result, Err(Error::UnsupportedCompression(_))));
}

#[test]
fn test_decompression_failure_keeps_earlier_text() {
    let data = pdb(
        "doc",
        b"TEXtREAd",
        &[
            palmdoc_record0(2, 2, 4096),
            b"first\n".to_vec(),
            // Back-reference into an empty record.
            vec![0x80, 0x80],
        ],
    );
    let (doc, result) = try_read(&data, &ReadOptions::default());
    assert!(matches!(result, Err(Error::Decompression(_))));
    assert_eq!(doc.texts(), vec!["first"]);
}

#[test]
fn test_zero_record_size_is_structural() {
    let data = pdb("doc", b"TEXtREAd", &[palmdoc_record0(1, 1, 0), b"x".to_vec()]);
    let (_, result) = try_read(&data, &ReadOptions::default());
    assert!(matches!(result, Err(Error::Structural(_))));
}
