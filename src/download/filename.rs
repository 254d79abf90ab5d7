//! Archive file naming.

use std::fmt::Write as _;

/// Builds `<prefix>_<filenum>.<extension>` as a single path segment.
///
/// Both parts go through [`encode_name_part`], so distinct filenums always
/// map to distinct file names.
pub(crate) fn archive_file_name(prefix: &str, filenum: &str, extension: &str) -> String {
    format!(
        "{}_{}.{extension}",
        encode_name_part(prefix),
        encode_name_part(filenum)
    )
}

/// Percent-encodes the bytes of characters that cannot appear in a file name.
///
/// Path separators, characters reserved on Windows, control characters, and
/// `%` itself become `%XX`, which keeps the mapping reversible.
pub(crate) fn encode_name_part(part: &str) -> String {
    let mut encoded = String::with_capacity(part.len());
    for c in part.chars() {
        if is_reserved(c) {
            let mut utf8 = [0u8; 4];
            for byte in c.encode_utf8(&mut utf8).bytes() {
                let _ = write!(encoded, "%{byte:02X}");
            }
        } else {
            encoded.push(c);
        }
    }
    encoded
}

fn is_reserved(c: char) -> bool {
    matches!(
        c,
        '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%'
    ) || c.is_control()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::{Component, Path};

    use super::*;

    #[test]
    fn test_archive_file_name_plain() {
        assert_eq!(archive_file_name("crmm", "17", "psd"), "crmm_17.psd");
        assert_eq!(
            archive_file_name("crmm", "K-3", "meta.xml"),
            "crmm_K-3.meta.xml"
        );
    }

    #[test]
    fn test_archive_file_name_encodes_separators() {
        let name = archive_file_name("crmm", "../etc/passwd", "psd");
        assert_eq!(name, "crmm_..%2Fetc%2Fpasswd.psd");
        let components: Vec<_> = Path::new(&name).components().collect();
        assert!(matches!(components.as_slice(), [Component::Normal(_)]));
    }

    #[test]
    fn test_archive_file_name_distinct_for_lookalike_filenums() {
        let names: HashSet<String> = ["K/9", "K_9", "K:9", "K?9", "K%2F9", "K\u{0}9"]
            .iter()
            .map(|filenum| archive_file_name("crmm", filenum, "psd"))
            .collect();
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_encode_name_part_control_and_percent() {
        assert_eq!(encode_name_part("a\u{0}b\nc"), "a%00b%0Ac");
        assert_eq!(encode_name_part("50%"), "50%25");
        assert_eq!(encode_name_part("naïve"), "naïve");
    }
}
