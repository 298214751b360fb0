//! In-memory gzip for small responses.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{self, Write};

/// Default size above which responses are gzip-streamed instead.
pub const DEFAULT_STREAM_THRESHOLD: u64 = 1024 * 1024;

pub fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_roundtrip() {
        let data = "body { color: red; }\n".repeat(200);
        let packed = gzip(data.as_bytes()).unwrap();
        assert!(packed.len() < data.len());

        let mut out = String::new();
        GzDecoder::new(&packed[..]).read_to_string(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
