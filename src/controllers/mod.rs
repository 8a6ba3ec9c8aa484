//! File to export controller
/// Health and version
pub mod system;
/// Merge, split, compress, protect, unlock and number pdf
pub mod pdf;
/// Conversions between pdf, docx and jpeg
pub mod convert;
