use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left alone by JavaScript's `encodeURIComponent`, minus the
/// apostrophe: paths end up inside single-quoted script literals.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Build the site-relative URL of `image` inside catalog `folder`.
///
/// Backslashes are treated as separators, so prefixes written with host path
/// conventions still produce `/`-joined URLs. The first two segments (the
/// asset and category roots) are kept verbatim; every later segment is
/// percent-encoded.
pub fn image_url(prefix: &str, folder: &str, image: &str) -> String {
    let segments = prefix
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .chain([folder, image]);
    segments
        .enumerate()
        .map(|(i, seg)| {
            if i < 2 {
                seg.to_string()
            } else {
                utf8_percent_encode(seg, COMPONENT).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
