/// Text encodings used by the dump files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
    /// US-ASCII: bytes above 0x7F are replaced with U+FFFD.
    Ascii,
}

impl Encoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Encoding::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin1_maps_high_bytes() {
        // "Amélie" in ISO-8859-1
        let bytes = [0x41, 0x6d, 0xe9, 0x6c, 0x69, 0x65];
        assert_eq!(Encoding::Latin1.decode(&bytes), "Amélie");
    }

    #[test]
    fn test_ascii_replaces_high_bytes() {
        let bytes = [0x41, 0xe9, 0x42];
        assert_eq!(Encoding::Ascii.decode(&bytes), "A\u{FFFD}B");
    }

    #[test]
    fn test_plain_ascii_identical() {
        let text = "1\tAction\r\n";
        assert_eq!(Encoding::Latin1.decode(text.as_bytes()), text);
        assert_eq!(Encoding::Ascii.decode(text.as_bytes()), text);
    }
}
