use crate::record::DefectRecord;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

lazy_static! {
    static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();
}

/// Directory inside the .xlsx container holding embedded images.
const MEDIA_PREFIX: &str = "xl/media/";

/// One embedded image pulled out of the workbook archive.
#[derive(Clone, Debug)]
pub struct MediaFile {
    /// Base file name inside the archive (e.g. "image3.png").
    pub name: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    /// MIME type guessed from the file extension.
    pub fn content_type(&self) -> &'static str {
        match self.name.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
            Some(ext) if ext == "gif" => "image/gif",
            Some(ext) if ext == "bmp" => "image/bmp",
            _ => "image/png",
        }
    }
}

/// Extract the embedded media files from the bytes of an .xlsx workbook.
///
/// The workbook is structurally a zip archive; everything under `xl/media/`
/// is collected and sorted numerically by the first digit run embedded in
/// the file name ("image10.png" after "image2.png"), falling back to a
/// plain lexical sort when any name carries no number.
///
/// Media is optional: an unreadable archive or a workbook without images
/// yields an empty list, never an error.
pub fn extract_media(bytes: &[u8]) -> Vec<MediaFile> {
    let Ok(mut archive) = ZipArchive::new(Cursor::new(bytes)) else {
        return Vec::new();
    };

    let mut media = Vec::new();
    for i in 0..archive.len() {
        let Ok(mut file) = archive.by_index(i) else {
            continue;
        };
        if file.is_dir() || !file.name().starts_with(MEDIA_PREFIX) {
            continue;
        }
        let name = file.name()[MEDIA_PREFIX.len()..].to_string();
        let mut bytes = Vec::new();
        if file.read_to_end(&mut bytes).is_ok() {
            media.push(MediaFile { name, bytes });
        }
    }

    sort_media(&mut media);
    media
}

fn sort_media(media: &mut [MediaFile]) {
    if media.iter().all(|m| numeric_key(&m.name).is_some()) {
        media.sort_by_key(|m| (numeric_key(&m.name), m.name.clone()));
    } else {
        media.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// First embedded digit run of a file name, for numeric ordering.
fn numeric_key(name: &str) -> Option<u64> {
    DIGIT_RUN
        .find(name)
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Pair every two media files with one defect: record `i` in output order
/// gets media `2i` as modality 1 and `2i + 1` as modality 2.
///
/// When the workbook holds fewer than two images per defect the pairing is
/// skipped entirely - a half-attached set would show the wrong image next
/// to a defect - and a warning is logged.
pub fn pair_media(
    records: &[DefectRecord],
    media: &[MediaFile],
) -> HashMap<u32, [usize; 2]> {
    if records.is_empty() {
        return HashMap::new();
    }
    if media.len() < records.len() * 2 {
        log::warn!(
            "data-image mismatch: {} defects but {} images, skipping image pairing",
            records.len(),
            media.len()
        );
        return HashMap::new();
    }

    records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.defect_id, [2 * i, 2 * i + 1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive_with(names: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("xl/worksheets/sheet1.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<worksheet/>").unwrap();
        for name in names {
            writer
                .start_file(format!("xl/media/{}", name), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(name.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn media_sorts_numerically_by_embedded_digits() {
        let bytes = archive_with(&["image10.png", "image2.png", "image1.png"]);
        let media = extract_media(&bytes);
        let names: Vec<&str> = media.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["image1.png", "image2.png", "image10.png"]);
    }

    #[test]
    fn media_falls_back_to_lexical_sort() {
        let bytes = archive_with(&["logo.png", "image2.png", "banner.png"]);
        let media = extract_media(&bytes);
        let names: Vec<&str> = media.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["banner.png", "image2.png", "logo.png"]);
    }

    #[test]
    fn non_media_entries_and_bad_archives_are_ignored() {
        let bytes = archive_with(&[]);
        assert!(extract_media(&bytes).is_empty());
        assert!(extract_media(b"not an archive").is_empty());
    }

    #[test]
    fn two_images_pair_to_each_defect_in_order() {
        let records = vec![record(11), record(7)];
        let media: Vec<MediaFile> = (1..=4)
            .map(|i| MediaFile {
                name: format!("image{}.png", i),
                bytes: Vec::new(),
            })
            .collect();

        let pairing = pair_media(&records, &media);
        assert_eq!(pairing.get(&11), Some(&[0, 1]));
        assert_eq!(pairing.get(&7), Some(&[2, 3]));
    }

    #[test]
    fn short_media_list_skips_pairing() {
        let records = vec![record(1), record(2)];
        let media = vec![MediaFile {
            name: "image1.png".to_string(),
            bytes: Vec::new(),
        }];
        assert!(pair_media(&records, &media).is_empty());
    }

    fn record(id: u32) -> DefectRecord {
        DefectRecord {
            defect_id: id,
            defect_type: "Short".to_string(),
            x_coordinate: 0.0,
            y_coordinate: 0.0,
            unit_row_index: 0,
            unit_col_index: 0,
        }
    }
}
