#![allow(dead_code)]

use iab_tcf::v1::{ConsentString, ParseMode, decode_str};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Deserialize)]
pub struct TestCase {
    consent_string: String,
    expected: Expected,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Expected {
    version: u8,
    created: i64,
    last_updated: i64,
    cmp_id: u16,
    cmp_version: u16,
    consent_screen: u8,
    consent_language: String,
    vendor_list_version: u16,
    purposes_allowed: Vec<u8>,
    max_vendor_id: u16,
    vendor_encoding: String,
    vendor_consents: Vec<u16>,
}

impl TestCase {
    pub fn load_from_file<P: AsRef<Path>>(p: P) -> io::Result<Self> {
        let f = File::open(p)?;
        let tc: Self = serde_json::from_reader(&f)
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e.to_string()))?;
        Ok(tc)
    }

    /// Decodes the string in both parse modes and compares each result to the expected values.
    pub fn assert_matches(&self) {
        let bytes = decode_str(&self.consent_string).expect("invalid base64 string");

        for mode in [ParseMode::Eager, ParseMode::Lazy] {
            let c = ConsentString::parse(&bytes, mode)
                .unwrap_or_else(|e| panic!("{mode} decode error: {e}"));
            self.assert_fields(&c, mode);

            #[cfg(feature = "serde")]
            assert_json_diff::assert_json_eq!(c, self.expected);
        }
    }

    fn assert_fields(&self, c: &ConsentString<'_>, mode: ParseMode) {
        let e = &self.expected;

        assert_eq!(c.version(), e.version, "{mode}: version");
        assert_eq!(c.created(), e.created, "{mode}: created");
        assert_eq!(c.last_updated(), e.last_updated, "{mode}: last_updated");
        assert_eq!(c.cmp_id(), e.cmp_id, "{mode}: cmp_id");
        assert_eq!(c.cmp_version(), e.cmp_version, "{mode}: cmp_version");
        assert_eq!(
            c.consent_screen(),
            e.consent_screen,
            "{mode}: consent_screen"
        );
        assert_eq!(
            c.consent_language(),
            e.consent_language,
            "{mode}: consent_language"
        );
        assert_eq!(
            c.vendor_list_version(),
            e.vendor_list_version,
            "{mode}: vendor_list_version"
        );
        assert_eq!(
            c.allowed_purposes().collect::<Vec<_>>(),
            e.purposes_allowed,
            "{mode}: purposes_allowed"
        );
        assert_eq!(c.max_vendor_id(), e.max_vendor_id, "{mode}: max_vendor_id");
        assert_eq!(
            c.vendor_encoding().to_string(),
            e.vendor_encoding,
            "{mode}: vendor_encoding"
        );

        let vendors = c
            .allowed_vendors()
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_else(|err| panic!("{mode} vendor lookup error: {err}"));
        assert_eq!(vendors, e.vendor_consents, "{mode}: vendor_consents");
    }
}

/// Packs a string of binary digits into bytes, ignoring whitespace and zero-padding the last byte.
pub fn b(s: &str) -> Vec<u8> {
    let bits = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c == '1')
        .collect::<Vec<_>>();

    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
        })
        .collect()
}

/// Binary digits of a header with fixed timestamps, CMP and purposes.
pub fn header(version: u8, language: &str, vendor_list_version: u16, max_vendor_id: u16) -> String {
    let language = language
        .bytes()
        .map(|c| format!("{:06b}", c - b'A'))
        .collect::<String>();
    format!(
        "{version:06b} {:036b} {:036b} {:012b} {:012b} {:06b} {language} {vendor_list_version:012b} {:024b} {max_vendor_id:016b}",
        15306795530u64, 15306901234u64, 42, 3, 1, 0x800001
    )
}

/// Builds a consent string from a valid header followed by `vendor_section`, starting with
/// its encoding flag.
pub fn consent(max_vendor_id: u16, vendor_section: &str) -> Vec<u8> {
    b(&format!("{} {vendor_section}", header(1, "EN", 8, max_vendor_id)))
}
