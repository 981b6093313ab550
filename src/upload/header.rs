//! Part header line parsing.
//!
//! Everything returned borrows from the line it was parsed from.

/// One parsed part header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PartHeader<'a> {
    /// `Content-Disposition`, with its attribute list.
    Disposition(DispositionParams<'a>),
    /// `Content-Type`, with its trimmed value.
    ContentType(&'a str),
    /// Any other header, or a line that is not a header at all.
    Other,
}

/// Parse a `Key: rest` line. The line must already be stripped of its CRLF.
pub(crate) fn parse(line: &str) -> PartHeader<'_> {
    let (key, rest) = match line.split_once(':') {
        Some((key, rest)) => (key.trim(), rest.trim()),
        None => return PartHeader::Other,
    };

    if key.eq_ignore_ascii_case("content-disposition") {
        PartHeader::Disposition(DispositionParams { rest })
    } else if key.eq_ignore_ascii_case("content-type") {
        PartHeader::ContentType(rest)
    } else {
        PartHeader::Other
    }
}

/// Iterator over the `;`-separated attributes of a `Content-Disposition`.
///
/// Yields `(token, value)` in wire order. A bare token such as `form-data`
/// has an empty value; quotes around a value are trimmed. A `;` inside a
/// quoted value does not end the attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DispositionParams<'a> {
    rest: &'a str,
}

impl<'a> Iterator for DispositionParams<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let end = attribute_end(self.rest);
            let attr = self.rest[..end].trim();
            self.rest = self.rest.get(end + 1..).unwrap_or("");

            if attr.is_empty() {
                continue;
            }
            return Some(match attr.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim().trim_matches('"')),
                None => (attr, ""),
            });
        }
        None
    }
}

/// Index of the first `;` outside of quotes, or the length of `s`.
fn attribute_end(s: &str) -> usize {
    let mut quoted = false;
    for (idx, byte) in s.bytes().enumerate() {
        match byte {
            b'"' => quoted = !quoted,
            b';' if !quoted => return idx,
            _ => {}
        }
    }
    s.len()
}
