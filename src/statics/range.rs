//! `Range` header parsing (single byte ranges only).

/// Result of evaluating a `Range` header against a file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Serve the whole file (no header, unsupported unit, malformed, or multi-range).
    Full,
    /// Inclusive window.
    Partial { start: u64, end: u64 },
    /// Syntactically valid but outside the file.
    Unsatisfiable,
}

impl ByteRange {
    /// Parse `bytes=start-end`, `bytes=start-` or `bytes=-suffix`.
    pub fn parse(header: &str, size: u64) -> Self {
        let Some(spec) = header.trim().strip_prefix("bytes=") else {
            return Self::Full;
        };
        if spec.contains(',') {
            return Self::Full;
        }
        let Some((first, last)) = spec.trim().split_once('-') else {
            return Self::Full;
        };
        let (first, last) = (first.trim(), last.trim());

        match (first.is_empty(), last.is_empty()) {
            // -500
            (true, false) => {
                let Ok(suffix) = last.parse::<u64>() else {
                    return Self::Full;
                };
                if suffix == 0 || size == 0 {
                    return Self::Unsatisfiable;
                }
                Self::Partial {
                    start: size.saturating_sub(suffix),
                    end: size - 1,
                }
            }
            // 500- and 0-499
            (false, _) => {
                let Ok(start) = first.parse::<u64>() else {
                    return Self::Full;
                };
                let end = if last.is_empty() {
                    u64::MAX
                } else {
                    match last.parse::<u64>() {
                        Ok(end) if end >= start => end,
                        _ => return Self::Full,
                    }
                };
                if start >= size {
                    return Self::Unsatisfiable;
                }
                Self::Partial {
                    start,
                    end: end.min(size - 1),
                }
            }
            (true, true) => Self::Full,
        }
    }
}
