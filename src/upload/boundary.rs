//! Boundary search inside part data.

/// Find the first occurrence of `marker` in `window`.
///
/// The marker's first byte is used as a `memchr` prefilter and every
/// candidate is then compared in full. A window shorter than the marker
/// never matches.
pub(crate) fn find(window: &[u8], marker: &[u8]) -> Option<usize> {
    let first = *marker.first()?;
    if window.len() < marker.len() {
        return None;
    }

    // Last index a full marker can start at, plus one.
    let end = window.len() - marker.len() + 1;
    let mut pos = 0;
    while pos < end {
        let offset = memchr::memchr(first, &window[pos..end])?;
        let candidate = pos + offset;
        if &window[candidate..candidate + marker.len()] == marker {
            return Some(candidate);
        }
        pos = candidate + 1;
    }
    None
}

/// How many trailing bytes of an unmatched window must be kept back.
///
/// Up to `marker.len() - 1` bytes may be the start of a marker continued in
/// the next chunk, and the CRLF in front of a marker belongs to the framing,
/// not the data.
pub(crate) fn holdback(marker: &[u8]) -> usize {
    marker.len() + 1
}

/// Strip the CRLF that precedes a boundary from the end of part data.
pub(crate) fn trim_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}
