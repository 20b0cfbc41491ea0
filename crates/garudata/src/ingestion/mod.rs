//! Format converters: each maps one kind of source artifact to a collection

mod delimited;
mod relational;
pub(crate) mod spreadsheet;

pub use delimited::DelimitedConverter;
pub use relational::RelationalConverter;
pub use spreadsheet::SpreadsheetConverter;

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Collection name derived from a source file: its stem
pub fn collection_name_for(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidCollectionName(path.display().to_string()))
}

/// Hash a source artifact for the catalog
pub fn hash_source(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| Error::source_unavailable(path.display().to_string(), e))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| Error::source_unavailable(path.display().to_string(), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
