//! File to export services
/// Pdf manipulation
pub mod pdf;
/// Password protection
pub mod crypt;
/// Jpeg embedding
pub mod image;
/// Zip archives
pub mod archive;
/// Docx writing
pub mod docx;
/// Ghostscript runner
pub mod ghostscript;
/// LibreOffice runner
pub mod libreoffice;
