//! Export Adapter - PDF / CBZ 文档封装

mod cbz_encoder;
mod pdf_encoder;

pub use cbz_encoder::CbzEncoder;
pub use pdf_encoder::PdfEncoder;
