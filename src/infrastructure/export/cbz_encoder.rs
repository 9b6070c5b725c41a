//! CBZ Encoder - 漫画归档（不压缩的 zip）
//!
//! 条目名 `page_{NNN}.png`，按源页面的 0 基索引编号

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::application::ports::{DocumentEncoderPort, EncodeError, ExportFormat, RenderedPage};

fn entry_name(source_index: usize) -> String {
    format!("page_{:03}.png", source_index)
}

/// CBZ 编码器
#[derive(Debug, Default)]
pub struct CbzEncoder;

impl CbzEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentEncoderPort for CbzEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Cbz
    }

    fn encode(&self, pages: &[RenderedPage]) -> Result<Vec<u8>, EncodeError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for page in pages {
            let name = entry_name(page.source_index);
            zip.start_file(name.as_str(), options)
                .map_err(|e| EncodeError::Assembly(format!("{name}: {e}")))?;
            zip.write_all(&page.image.png)
                .map_err(|e| EncodeError::Assembly(format!("{name}: {e}")))?;
        }

        let bytes = zip
            .finish()
            .map_err(|e| EncodeError::Assembly(e.to_string()))?
            .into_inner();

        tracing::debug!(
            pages = pages.len(),
            size_bytes = bytes.len(),
            "CBZ assembled"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RasterImage;
    use std::io::Read;
    use zip::ZipArchive;

    fn rendered(source_index: usize, png: &[u8]) -> RenderedPage {
        RenderedPage {
            source_index,
            image: RasterImage {
                width: 1,
                height: 1,
                png: png.to_vec(),
            },
        }
    }

    #[test]
    fn test_entry_names() {
        assert_eq!(entry_name(0), "page_000.png");
        assert_eq!(entry_name(12), "page_012.png");
        assert_eq!(entry_name(1234), "page_1234.png");
    }

    #[test]
    fn test_entries_follow_source_index_and_are_stored() {
        let bytes = CbzEncoder::new()
            .encode(&[rendered(0, b"first"), rendered(2, b"third")])
            .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_index(1).unwrap();
        assert_eq!(entry.name(), "page_002.png");
        assert_eq!(entry.compression(), CompressionMethod::Stored);
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"third");
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = CbzEncoder::new().encode(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
