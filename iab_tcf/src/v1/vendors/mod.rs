//! Vendor consent section of a v1.1 consent string.
//!
//! The section starts right after the header, at bit 172, with a flag giving its encoding:
//!
//! - `0`: a [`BitField`], holding one bit per vendor,
//! - `1`: a range section, holding a default consent value and a list of exceptions to it.
//!
//! Range sections are decoded either fully when the string is parsed ([`RangeSection`]),
//! or entry by entry on every lookup ([`LazyRangeSection`]).
//!
use crate::core::is_set;
use crate::v1::ParseMode;
use crate::v1::metadata::Metadata;
#[cfg(feature = "serde")]
use serde::Serialize;
use std::io;
use strum_macros::Display;
use thiserror::Error;

pub use bitfield::BitField;
pub use range::{LazyRangeSection, RangeEntries, RangeEntry, RangeSection};

mod bitfield;
mod range;

/// Position of the encoding type flag.
pub(crate) const ENCODING_TYPE_BIT: usize = 172;

/// The error type describing a vendor section which cannot be trusted.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VendorSectionError {
    /// The string ends before the end of the vendor section.
    #[error("vendor section needs {needed} bits but the string only holds {available}")]
    Truncated { needed: usize, available: usize },
    /// A range entry ends before it starts.
    #[error("range entry {index} starts at vendor id {start} after its end {end}")]
    InvertedRange { index: usize, start: u16, end: u16 },
    /// A range entry references a vendor which cannot exist in this string.
    #[error("range entry {index} references vendor id {vendor_id} outside of [1, {max_vendor_id}]")]
    VendorIdOutOfBounds {
        index: usize,
        vendor_id: u16,
        max_vendor_id: u16,
    },
    /// An I/O error occurred while reading the section.
    #[error("unable to read vendor section: {source}")]
    Read {
        #[from]
        source: io::Error,
    },
}

/// The encoding used by the vendor section.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum VendorEncoding {
    BitField,
    Range,
}

impl From<bool> for VendorEncoding {
    fn from(is_range: bool) -> Self {
        if is_range {
            Self::Range
        } else {
            Self::BitField
        }
    }
}

/// Per-vendor consent lookup.
///
/// Lookups are defined for every `u16`: vendors outside of `[1, max_vendor_id]` get the
/// section's default answer instead of an error.
pub trait VendorConsents {
    /// Returns whether the given vendor has the user's consent.
    ///
    /// # Errors
    ///
    /// Returns a [`VendorSectionError`] if the part of the section needed to answer is malformed.
    fn is_vendor_allowed(&self, vendor_id: u16) -> Result<bool, VendorSectionError>;
}

/// Vendor section of a parsed consent string, as selected by its encoding flag and the
/// [`ParseMode`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum VendorSection<'a> {
    BitField(BitField<'a>),
    Range(RangeSection),
    LazyRange(LazyRangeSection<'a>),
}

impl<'a> VendorSection<'a> {
    pub(crate) fn parse(
        metadata: &Metadata<'a>,
        mode: ParseMode,
    ) -> Result<Self, VendorSectionError> {
        let encoding = VendorEncoding::from(is_set(metadata.data(), ENCODING_TYPE_BIT)?);

        Ok(match (encoding, mode) {
            (VendorEncoding::BitField, _) => Self::BitField(BitField::parse(metadata)?),
            (VendorEncoding::Range, ParseMode::Eager) => {
                Self::Range(RangeSection::parse(metadata)?)
            }
            (VendorEncoding::Range, ParseMode::Lazy) => {
                Self::LazyRange(LazyRangeSection::parse(metadata)?)
            }
        })
    }

    pub fn encoding(&self) -> VendorEncoding {
        match self {
            Self::BitField(_) => VendorEncoding::BitField,
            Self::Range(_) | Self::LazyRange(_) => VendorEncoding::Range,
        }
    }
}

impl VendorConsents for VendorSection<'_> {
    fn is_vendor_allowed(&self, vendor_id: u16) -> Result<bool, VendorSectionError> {
        match self {
            Self::BitField(s) => s.is_vendor_allowed(vendor_id),
            Self::Range(s) => s.is_vendor_allowed(vendor_id),
            Self::LazyRange(s) => s.is_vendor_allowed(vendor_id),
        }
    }
}
