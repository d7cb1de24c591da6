use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// BLAKE3 digest of a file's full contents, hex encoded.
/// Reads the whole file; the crawler never calls this.
pub fn content_hash(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
