/// `%PDF-`
pub const PDF_SIGNATURE: &[u8; 5] = b"%PDF-";

/// How far into the payload the signature may appear.
pub const SIGNATURE_PROBE_LEN: usize = 1024;

/// Payloads shorter than this are never a usable document.
const MIN_DOCUMENT_LEN: usize = 8;

/// Whether `bytes` look like a PDF: the signature must start within the first
/// [`SIGNATURE_PROBE_LEN`] bytes. Leading junk before the header is tolerated,
/// as PDF readers do.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    if bytes.len() < MIN_DOCUMENT_LEN {
        return false;
    }

    let probe = &bytes[..bytes.len().min(SIGNATURE_PROBE_LEN)];
    probe
        .windows(PDF_SIGNATURE.len())
        .any(|window| window == PDF_SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_header() {
        assert!(looks_like_pdf(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n"));
    }

    #[test]
    fn test_header_after_junk() {
        let mut bytes = vec![0u8; 500];
        bytes.extend_from_slice(b"%PDF-1.4 rest of file");
        assert!(looks_like_pdf(&bytes));
    }

    #[test]
    fn test_header_at_probe_boundary() {
        // Signature occupies bytes 1019..1024: the last position that fits.
        let mut fits = vec![b' '; 1019];
        fits.extend_from_slice(b"%PDF-1.4");
        assert!(looks_like_pdf(&fits));

        // Starting one byte later it runs past the probe.
        let mut spills = vec![b' '; 1020];
        spills.extend_from_slice(b"%PDF-1.4");
        assert!(!looks_like_pdf(&spills));
    }

    #[test]
    fn test_header_beyond_probe() {
        let mut bytes = vec![b' '; 1024];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert!(!looks_like_pdf(&bytes));
    }

    #[test]
    fn test_html_error_page() {
        assert!(!looks_like_pdf(b"<!doctype html><html><body>Not Found</body></html>"));
    }

    #[test]
    fn test_too_short() {
        assert!(!looks_like_pdf(b"%PDF-"));
        assert!(!looks_like_pdf(b""));
    }
}
