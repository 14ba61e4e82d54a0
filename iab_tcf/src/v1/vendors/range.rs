use crate::core::{DataReader, bit_len, is_set, read_bits};
use crate::v1::metadata::Metadata;
use crate::v1::vendors::{VendorConsents, VendorSectionError};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::iter::FusedIterator;

const DEFAULT_CONSENT_BIT: usize = 173;
const NUM_ENTRIES_BIT: usize = 174;
const FIRST_ENTRY_BIT: usize = 186;

/// An exception to the default consent of a range section.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum RangeEntry {
    Single(u16),
    Range { start: u16, end: u16 },
}

impl RangeEntry {
    pub fn start(&self) -> u16 {
        match *self {
            Self::Single(id) => id,
            Self::Range { start, .. } => start,
        }
    }

    pub fn end(&self) -> u16 {
        match *self {
            Self::Single(id) => id,
            Self::Range { end, .. } => end,
        }
    }

    pub fn contains(&self, vendor_id: u16) -> bool {
        (self.start()..=self.end()).contains(&vendor_id)
    }

    fn validate(self, index: usize, max_vendor_id: u16) -> Result<Self, VendorSectionError> {
        let (start, end) = (self.start(), self.end());
        if start > end {
            return Err(VendorSectionError::InvertedRange { index, start, end });
        }

        for vendor_id in [start, end] {
            if vendor_id < 1 || vendor_id > max_vendor_id {
                return Err(VendorSectionError::VendorIdOutOfBounds {
                    index,
                    vendor_id,
                    max_vendor_id,
                });
            }
        }

        Ok(self)
    }
}

/// Fixed part of a range section, found before its entries.
#[derive(Debug, Clone, Copy)]
struct RangeHeader {
    default_consent: bool,
    num_entries: u16,
}

impl RangeHeader {
    fn parse(data: &[u8]) -> Result<Self, VendorSectionError> {
        let available = bit_len(data);
        if FIRST_ENTRY_BIT > available {
            return Err(VendorSectionError::Truncated {
                needed: FIRST_ENTRY_BIT,
                available,
            });
        }

        Ok(Self {
            default_consent: is_set(data, DEFAULT_CONSENT_BIT)?,
            num_entries: read_bits(data, NUM_ENTRIES_BIT, 12)?,
        })
    }
}

/// Range section decoded and validated when the consent string is parsed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RangeSection {
    max_vendor_id: u16,
    default_consent: bool,
    entries: Vec<RangeEntry>,
    /// Sorted, disjoint and non-adjacent vendor ID intervals covered by the entries.
    exceptions: Vec<(u16, u16)>,
}

impl RangeSection {
    pub(crate) fn parse(metadata: &Metadata) -> Result<Self, VendorSectionError> {
        let data = metadata.data();
        let max_vendor_id = metadata.max_vendor_id();
        let header = RangeHeader::parse(data)?;

        let entries = RangeEntries::new(data, header.num_entries, max_vendor_id)
            .collect::<Result<Vec<_>, _>>()?;
        let exceptions = merge_intervals(&entries);

        Ok(Self {
            max_vendor_id,
            default_consent: header.default_consent,
            entries,
            exceptions,
        })
    }

    pub fn max_vendor_id(&self) -> u16 {
        self.max_vendor_id
    }

    /// Consent given to every vendor not listed in the entries.
    pub fn default_consent(&self) -> bool {
        self.default_consent
    }

    /// Entries in their encoded order.
    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }
}

impl VendorConsents for RangeSection {
    fn is_vendor_allowed(&self, vendor_id: u16) -> Result<bool, VendorSectionError> {
        let following = self
            .exceptions
            .partition_point(|&(start, _)| start <= vendor_id);
        let is_exception = following
            .checked_sub(1)
            .and_then(|i| self.exceptions.get(i))
            .is_some_and(|&(_, end)| vendor_id <= end);

        Ok(self.default_consent ^ is_exception)
    }
}

/// Sorts the entries by start and merges the ones overlapping or touching each other.
fn merge_intervals(entries: &[RangeEntry]) -> Vec<(u16, u16)> {
    let mut intervals = entries
        .iter()
        .map(|e| (e.start(), e.end()))
        .collect::<Vec<_>>();
    intervals.sort_unstable();

    let mut merged: Vec<(u16, u16)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some((_, last_end)) if u32::from(start) <= u32::from(*last_end) + 1 => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }

    merged
}

/// Range section whose entries are decoded and validated on every lookup.
///
/// Only the default consent and the number of entries are read when the consent string
/// is parsed. A malformed entry makes the lookups reaching it fail, without affecting the
/// lookups answered by a previous entry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LazyRangeSection<'a> {
    data: &'a [u8],
    max_vendor_id: u16,
    default_consent: bool,
    num_entries: u16,
}

impl<'a> LazyRangeSection<'a> {
    pub(crate) fn parse(metadata: &Metadata<'a>) -> Result<Self, VendorSectionError> {
        let data = metadata.data();
        let header = RangeHeader::parse(data)?;

        Ok(Self {
            data,
            max_vendor_id: metadata.max_vendor_id(),
            default_consent: header.default_consent,
            num_entries: header.num_entries,
        })
    }

    pub fn max_vendor_id(&self) -> u16 {
        self.max_vendor_id
    }

    pub fn default_consent(&self) -> bool {
        self.default_consent
    }

    pub fn num_entries(&self) -> u16 {
        self.num_entries
    }

    /// Decodes the entries in their encoded order.
    pub fn entries(&self) -> RangeEntries<'a> {
        RangeEntries::new(self.data, self.num_entries, self.max_vendor_id)
    }
}

impl VendorConsents for LazyRangeSection<'_> {
    fn is_vendor_allowed(&self, vendor_id: u16) -> Result<bool, VendorSectionError> {
        // no valid entry can reference these
        if vendor_id < 1 || vendor_id > self.max_vendor_id {
            return Ok(self.default_consent);
        }

        for entry in self.entries() {
            if entry?.contains(vendor_id) {
                return Ok(!self.default_consent);
            }
        }

        Ok(self.default_consent)
    }
}

/// Iterator decoding range entries one at a time.
///
/// Created with the method [`entries`](LazyRangeSection::entries). Each entry is validated
/// before being returned; iteration stops after the first error.
#[derive(Debug, Clone)]
pub struct RangeEntries<'a> {
    data: &'a [u8],
    position: usize,
    index: usize,
    num_entries: usize,
    max_vendor_id: u16,
}

impl<'a> RangeEntries<'a> {
    fn new(data: &'a [u8], num_entries: u16, max_vendor_id: u16) -> Self {
        Self {
            data,
            position: FIRST_ENTRY_BIT,
            index: 0,
            num_entries: usize::from(num_entries),
            max_vendor_id,
        }
    }

    fn read_entry(&mut self) -> Result<RangeEntry, VendorSectionError> {
        let is_range = self.read_fields(1)?.read_bool()?;
        let entry = if is_range {
            let mut r = self.read_fields(32)?;
            RangeEntry::Range {
                start: r.read_fixed_integer(16)?,
                end: r.read_fixed_integer(16)?,
            }
        } else {
            RangeEntry::Single(self.read_fields(16)?.read_fixed_integer(16)?)
        };

        entry.validate(self.index, self.max_vendor_id)
    }

    /// Returns a reader on the next `bits` bits, after checking they are all present.
    fn read_fields(&mut self, bits: usize) -> Result<DataReader<'a>, VendorSectionError> {
        let needed = self.position + bits;
        let available = bit_len(self.data);
        if needed > available {
            return Err(VendorSectionError::Truncated { needed, available });
        }

        let r = DataReader::at(self.data, self.position)?;
        self.position = needed;
        Ok(r)
    }
}

impl Iterator for RangeEntries<'_> {
    type Item = Result<RangeEntry, VendorSectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.num_entries {
            return None;
        }

        let entry = self.read_entry();
        self.index = if entry.is_ok() {
            self.index + 1
        } else {
            self.num_entries
        };

        Some(entry)
    }
}

impl FusedIterator for RangeEntries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v1::vendors::tests::consent_bytes;
    use test_case::test_case;

    /// Default consent, one range entry from 3 to 5.
    const DEFAULT_WITH_RANGE: &str =
        "1 1 000000000001 1 0000000000000011 0000000000000101";

    /// No default consent; vendors 2, 7 to 8 and 10.
    const EXCEPTIONS: &str = "1 0 000000000011 \
        0 0000000000000010 \
        1 0000000000000111 0000000000001000 \
        0 0000000000001010";

    fn eager(data: &[u8]) -> Result<RangeSection, VendorSectionError> {
        RangeSection::parse(&Metadata::parse(data).unwrap())
    }

    fn lazy(data: &[u8]) -> Result<LazyRangeSection<'_>, VendorSectionError> {
        LazyRangeSection::parse(&Metadata::parse(data).unwrap())
    }

    #[test_case(1 => true)]
    #[test_case(2 => true)]
    #[test_case(3 => false ; "range start")]
    #[test_case(4 => false)]
    #[test_case(5 => false ; "range end")]
    #[test_case(6 => true)]
    #[test_case(0 => true ; "vendor zero gets the default")]
    #[test_case(11 => true ; "after max vendor id")]
    fn default_consent_with_range(vendor_id: u16) -> bool {
        let data = consent_bytes(10, DEFAULT_WITH_RANGE);
        let eager = eager(&data).unwrap().is_vendor_allowed(vendor_id).unwrap();
        let lazy = lazy(&data).unwrap().is_vendor_allowed(vendor_id).unwrap();

        assert_eq!(eager, lazy);
        eager
    }

    #[test]
    fn exceptions_to_no_consent() {
        let data = consent_bytes(10, EXCEPTIONS);
        let eager = eager(&data).unwrap();
        let lazy = lazy(&data).unwrap();

        for section in [&eager as &dyn VendorConsents, &lazy] {
            let allowed = (0..=12)
                .filter(|&id| section.is_vendor_allowed(id).unwrap())
                .collect::<Vec<_>>();
            assert_eq!(allowed, vec![2, 7, 8, 10]);
        }
    }

    #[test]
    fn entries_keep_encoded_order() {
        let data = consent_bytes(10, EXCEPTIONS);
        let expected = vec![
            RangeEntry::Single(2),
            RangeEntry::Range { start: 7, end: 8 },
            RangeEntry::Single(10),
        ];

        assert_eq!(eager(&data).unwrap().entries(), expected.as_slice());
        assert_eq!(
            lazy(&data)
                .unwrap()
                .entries()
                .collect::<Result<Vec<_>, _>>()
                .unwrap(),
            expected
        );
    }

    #[test]
    fn overlapping_entries() {
        let data = consent_bytes(
            10,
            "1 1 000000000010 \
            1 0000000000000010 0000000000000110 \
            1 0000000000000100 0000000000001000",
        );
        let eager = eager(&data).unwrap();

        let allowed = (1..=10)
            .filter(|&id| eager.is_vendor_allowed(id).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(allowed, vec![1, 9, 10]);
    }

    #[test]
    fn overlapping_entries_are_merged() {
        let data = consent_bytes(
            20,
            "1 0 000000000100 \
            1 0000000000001010 0000000000001100 \
            0 0000000000000010 \
            1 0000000000000011 0000000000000101 \
            1 0000000000000100 0000000000001001",
        );
        let eager = eager(&data).unwrap();

        assert_eq!(eager.exceptions, vec![(2, 12)]);
        let allowed = (0..=21)
            .filter(|&id| eager.is_vendor_allowed(id).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(allowed, (2..=12).collect::<Vec<_>>());
    }

    #[test_case("1 0 000000000010 0 0000000000000101 0 0000000000000111" => vec![(5, 5), (7, 7)] ; "gap between singles")]
    #[test_case("1 0 000000000010 0 0000000000001000 0 0000000000000111" => vec![(7, 8)] ; "touching singles")]
    #[test_case("1 0 000000000010 1 0000000000000001 0000000000010100 0 0000000000000011" => vec![(1, 20)] ; "single inside range")]
    fn merged_exceptions(section: &str) -> Vec<(u16, u16)> {
        eager(&consent_bytes(20, section)).unwrap().exceptions
    }

    #[test]
    fn many_full_width_ranges() {
        // the largest entry count, each entry covering every vendor
        let section = format!(
            "1 0 {:012b} {}",
            4095,
            format!("1 {:016b} {:016b} ", 1, u16::MAX).repeat(4095)
        );
        let data = consent_bytes(u16::MAX, &section);
        let eager = eager(&data).unwrap();

        assert_eq!(eager.entries().len(), 4095);
        assert_eq!(eager.exceptions, vec![(1, u16::MAX)]);
        assert!(!eager.is_vendor_allowed(0).unwrap());
        assert!(eager.is_vendor_allowed(1).unwrap());
        assert!(eager.is_vendor_allowed(u16::MAX).unwrap());
    }

    #[test]
    fn no_entries() {
        let data = consent_bytes(3, "1 1 000000000000");
        assert!(eager(&data).unwrap().is_vendor_allowed(2).unwrap());
        assert!(lazy(&data).unwrap().is_vendor_allowed(2).unwrap());
    }

    #[test_case("1 1 000000000001 1 0000000000000101 0000000000000011" => matches VendorSectionError::InvertedRange { index: 0, start: 5, end: 3 } ; "inverted range")]
    #[test_case("1 1 000000000001 0 0000000000000000" => matches VendorSectionError::VendorIdOutOfBounds { index: 0, vendor_id: 0, .. } ; "vendor zero")]
    #[test_case("1 1 000000000010 0 0000000000000001 0 0000000000001011" => matches VendorSectionError::VendorIdOutOfBounds { index: 1, vendor_id: 11, max_vendor_id: 10 } ; "single after max vendor id")]
    #[test_case("1 1 000000000001 1 0000000000000001 0000000000001011" => matches VendorSectionError::VendorIdOutOfBounds { index: 0, vendor_id: 11, .. } ; "range end after max vendor id")]
    #[test_case("1 1 000000000011 0 0000000000000001" => matches VendorSectionError::Truncated { .. } ; "more entries than encoded")]
    #[test_case("1 1 0000000" => matches VendorSectionError::Truncated { needed: 186, .. } ; "missing entry count")]
    fn eager_error(section: &str) -> VendorSectionError {
        eager(&consent_bytes(10, section)).unwrap_err()
    }

    #[test]
    fn lazy_defers_entry_errors() {
        let data = consent_bytes(
            10,
            "1 1 000000000010 \
            0 0000000000000010 \
            1 0000000000000101 0000000000000011",
        );
        assert!(eager(&data).is_err());

        let lazy = lazy(&data).unwrap();
        // answered by the first entry
        assert!(!lazy.is_vendor_allowed(2).unwrap());
        // needs the inverted second entry
        assert!(matches!(
            lazy.is_vendor_allowed(4),
            Err(VendorSectionError::InvertedRange { index: 1, .. })
        ));
        // still usable afterwards
        assert!(!lazy.is_vendor_allowed(2).unwrap());
        // out of range lookups never read the entries
        assert!(lazy.is_vendor_allowed(11).unwrap());
    }

    #[test]
    fn lazy_defers_truncation() {
        let data = consent_bytes(10, "1 0 000000000011 0 0000000000000001");
        let lazy = lazy(&data).unwrap();

        assert!(lazy.is_vendor_allowed(1).unwrap());
        assert!(matches!(
            lazy.is_vendor_allowed(2),
            Err(VendorSectionError::Truncated { .. })
        ));
    }

    #[test]
    fn lazy_requires_entry_count() {
        let data = consent_bytes(10, "1 1 0000000");
        assert!(matches!(
            lazy(&data),
            Err(VendorSectionError::Truncated {
                needed: 186,
                available: 184
            })
        ));
    }

    #[test]
    fn entries_stop_after_error() {
        let data = consent_bytes(10, "1 1 000000000011 0 0000000000001111");
        let mut entries = lazy(&data).unwrap().entries();

        assert!(matches!(entries.next(), Some(Err(_))));
        assert!(entries.next().is_none());
    }

    #[test_case(RangeEntry::Single(4), 4 => true)]
    #[test_case(RangeEntry::Single(4), 5 => false)]
    #[test_case(RangeEntry::Range { start: 2, end: 4 }, 2 => true ; "range start")]
    #[test_case(RangeEntry::Range { start: 2, end: 4 }, 4 => true ; "range end")]
    #[test_case(RangeEntry::Range { start: 2, end: 4 }, 5 => false ; "after range")]
    fn entry_contains(entry: RangeEntry, vendor_id: u16) -> bool {
        entry.contains(vendor_id)
    }
}
