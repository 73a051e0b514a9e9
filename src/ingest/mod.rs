//! Write-side event intake: the HTTP handler and the buffered storage path
//! behind it.

pub mod buffer;
pub mod handler;
