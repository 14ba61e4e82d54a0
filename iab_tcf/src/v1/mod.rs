//! Version 1.1 of the IAB TCF Vendor Consent String.
//!
//! A consent string is a bit-packed binary payload, usually transported as URL-safe Base64
//! text, such as:
//!
//! ```text
//! BOEFEAyOEFEAyAHABDENAI4AAAB9vABAASA
//! ```
//!
//! It starts with a fixed-layout header (see [`Metadata`]), followed by a vendor consent
//! section encoded either as a bit field or as a list of ranges (see [`vendors`]).
//!
//! # Examples
//!
//! The text form must first be turned into bytes with [`decode_str`]. The bytes are then
//! parsed with [`ConsentString::parse`], which borrows them:
//!
//! ```
//! use iab_tcf::v1::{ConsentDecodeError, ConsentString, ParseMode, decode_str};
//!
//! fn main() -> Result<(), ConsentDecodeError> {
//!     let bytes = decode_str("BOEFEAyOEFEAyAHABDENAI4AAAB9vABAASA")?;
//!     let consent = ConsentString::parse(&bytes, ParseMode::Eager)?;
//!
//!     assert_eq!(consent.cmp_id(), 7);
//!     assert_eq!(consent.consent_language(), "EN");
//!     assert!(consent.purpose_allowed(1));
//!     assert!(consent.vendor_allowed(8)?);
//!     assert!(!consent.vendor_allowed(9)?);
//!     Ok(())
//! }
//! ```
//!
//! # Parse modes
//!
//! With [`ParseMode::Eager`], the whole vendor section is decoded and validated up front,
//! so that vendor lookups never fail afterwards.
//!
//! With [`ParseMode::Lazy`], only the header is validated when parsing. Range entries are
//! decoded on each lookup, and a lookup which reaches a malformed entry returns an error:
//!
//! ```
//! use iab_tcf::v1::{ConsentDecodeError, ParseMode, decode_str, parse};
//!
//! fn main() -> Result<(), ConsentDecodeError> {
//!     let bytes = decode_str("BOEFEAyOEFEAyAHABDENAI4AAAB9vABAASA")?;
//!     let consent = parse(&bytes, ParseMode::Lazy)?;
//!
//!     assert!(!consent.vendor_allowed(9)?);
//!     Ok(())
//! }
//! ```
//!
//! Both modes return the same answers for well-formed strings.
//!
use crate::core::base64::decode_base64_url;
use crate::v1::metadata::{MIN_CONSENT_STRING_LEN, Metadata};
use crate::v1::vendors::{VendorConsents, VendorEncoding, VendorSection, VendorSectionError};
#[cfg(feature = "serde")]
use serde::Serialize;
use std::io;
use strum_macros::Display;
use thiserror::Error;

pub use crate::core::base64::DecodeError;

pub mod metadata;
pub mod vendors;

/// The error type for consent string decoding operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConsentDecodeError {
    /// The string is too short to hold a complete header.
    #[error("consent strings are at least {MIN_CONSENT_STRING_LEN} bytes long (found {len})")]
    TooShort { len: usize },
    /// The header encodes a version of 0.
    #[error("invalid version (expected at least 1, found {found})")]
    InvalidVersion { found: u8 },
    /// The header encodes a max vendor ID of 0.
    #[error("invalid max vendor id (expected at least 1, found {found})")]
    InvalidMaxVendorId { found: u16 },
    /// The header encodes a vendor list version of 0.
    #[error("invalid vendor list version (expected at least 1, found 0)")]
    InvalidVendorListVersion,
    /// The vendor section is truncated or references invalid vendors.
    ///
    /// With [`ParseMode::Lazy`], this error can be returned by vendor lookups.
    #[error("malformed vendor section: {0}")]
    MalformedVendorSection(#[from] VendorSectionError),
    /// The text form of the string is not valid Base64.
    #[error("unable to decode string: {0}")]
    DecodeString(#[from] DecodeError),
    /// An I/O error occurred while reading the string.
    #[error("unable to read string: {source}")]
    Read {
        #[from]
        source: io::Error,
    },
}

/// When to decode and validate the vendor section.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ParseMode {
    /// Decode and validate everything while parsing.
    #[default]
    Eager,
    /// Validate the header while parsing, and decode range entries on each lookup.
    Lazy,
}

/// Decodes the URL-safe Base64 text form of a consent string into bytes.
///
/// # Errors
///
/// Returns [`ConsentDecodeError::DecodeString`] if the string contains characters outside of
/// the URL-safe Base64 alphabet.
///
pub fn decode_str(s: &str) -> Result<Vec<u8>, ConsentDecodeError> {
    Ok(decode_base64_url(s)?)
}

/// Parses a consent string with the given mode.
///
/// This is equivalent to [`ConsentString::parse`].
pub fn parse(data: &[u8], mode: ParseMode) -> Result<ConsentString<'_>, ConsentDecodeError> {
    ConsentString::parse(data, mode)
}

/// Parses a consent string with [`ParseMode::Eager`].
pub fn parse_eagerly(data: &[u8]) -> Result<ConsentString<'_>, ConsentDecodeError> {
    ConsentString::parse(data, ParseMode::Eager)
}

/// Parses a consent string with [`ParseMode::Lazy`].
pub fn parse_lazily(data: &[u8]) -> Result<ConsentString<'_>, ConsentDecodeError> {
    ConsentString::parse(data, ParseMode::Lazy)
}

/// The representation of a parsed consent string.
///
/// It borrows the bytes it was parsed from, and gives access to the header fields and to the
/// consent given to each vendor.
#[derive(Debug, Clone)]
pub struct ConsentString<'a> {
    metadata: Metadata<'a>,
    vendors: VendorSection<'a>,
    mode: ParseMode,
}

impl<'a> ConsentString<'a> {
    /// Parses a consent string from its binary form.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsentDecodeError`] if the header is invalid, or if the vendor section
    /// is malformed. With [`ParseMode::Lazy`], malformed range entries are only reported by
    /// [`vendor_allowed`](ConsentString::vendor_allowed).
    ///
    /// # Example
    ///
    /// ```
    /// use iab_tcf::v1::{ConsentDecodeError, ConsentString, ParseMode};
    ///
    /// let r = ConsentString::parse(&[0; 8], ParseMode::Eager);
    ///
    /// assert!(matches!(r, Err(ConsentDecodeError::TooShort { len: 8 })));
    /// ```
    ///
    pub fn parse(data: &'a [u8], mode: ParseMode) -> Result<Self, ConsentDecodeError> {
        let metadata = Metadata::parse(data)?;
        let vendors = VendorSection::parse(&metadata, mode)?;

        Ok(Self {
            metadata,
            vendors,
            mode,
        })
    }

    pub fn metadata(&self) -> &Metadata<'a> {
        &self.metadata
    }

    pub fn vendor_section(&self) -> &VendorSection<'a> {
        &self.vendors
    }

    pub fn parse_mode(&self) -> ParseMode {
        self.mode
    }

    pub fn vendor_encoding(&self) -> VendorEncoding {
        self.vendors.encoding()
    }

    pub fn version(&self) -> u8 {
        self.metadata.version()
    }

    /// Creation time, in seconds since the Unix epoch.
    pub fn created(&self) -> i64 {
        self.metadata.created()
    }

    /// Last update time, in seconds since the Unix epoch.
    pub fn last_updated(&self) -> i64 {
        self.metadata.last_updated()
    }

    pub fn cmp_id(&self) -> u16 {
        self.metadata.cmp_id()
    }

    pub fn cmp_version(&self) -> u16 {
        self.metadata.cmp_version()
    }

    pub fn consent_screen(&self) -> u8 {
        self.metadata.consent_screen()
    }

    pub fn consent_language(&self) -> String {
        self.metadata.consent_language()
    }

    pub fn vendor_list_version(&self) -> u16 {
        self.metadata.vendor_list_version()
    }

    pub fn max_vendor_id(&self) -> u16 {
        self.metadata.max_vendor_id()
    }

    /// Returns whether the user allowed the given purpose, from 1 to 24.
    pub fn purpose_allowed(&self, purpose_id: u8) -> bool {
        self.metadata.purpose_allowed(purpose_id)
    }

    pub fn allowed_purposes(&self) -> impl Iterator<Item = u8> + use<'a> {
        self.metadata.allowed_purposes()
    }

    /// Returns whether the user gave consent to the given vendor.
    ///
    /// Vendors with an ID of 0 or above the max vendor ID do not have consent with a bit
    /// field encoding, and get the default consent with a range encoding.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentDecodeError::MalformedVendorSection`] if the string was parsed with
    /// [`ParseMode::Lazy`] and a range entry needed to answer is malformed. Eagerly parsed
    /// strings never fail here.
    ///
    pub fn vendor_allowed(&self, vendor_id: u16) -> Result<bool, ConsentDecodeError> {
        Ok(self.vendors.is_vendor_allowed(vendor_id)?)
    }

    /// Iterates over the IDs of all vendors having the user's consent, in ascending order.
    pub fn allowed_vendors(&self) -> impl Iterator<Item = Result<u16, ConsentDecodeError>> + '_ {
        (1..=self.max_vendor_id()).filter_map(move |id| match self.vendor_allowed(id) {
            Ok(true) => Some(Ok(id)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        })
    }
}

impl VendorConsents for ConsentString<'_> {
    fn is_vendor_allowed(&self, vendor_id: u16) -> Result<bool, VendorSectionError> {
        self.vendors.is_vendor_allowed(vendor_id)
    }
}

#[cfg(feature = "serde")]
impl Serialize for ConsentString<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::{Error, SerializeStruct};

        let vendor_consents = self
            .allowed_vendors()
            .collect::<Result<Vec<_>, _>>()
            .map_err(S::Error::custom)?;

        let mut s = serializer.serialize_struct("ConsentString", 12)?;
        s.serialize_field("version", &self.version())?;
        s.serialize_field("created", &self.created())?;
        s.serialize_field("last_updated", &self.last_updated())?;
        s.serialize_field("cmp_id", &self.cmp_id())?;
        s.serialize_field("cmp_version", &self.cmp_version())?;
        s.serialize_field("consent_screen", &self.consent_screen())?;
        s.serialize_field("consent_language", &self.consent_language())?;
        s.serialize_field("vendor_list_version", &self.vendor_list_version())?;
        s.serialize_field(
            "purposes_allowed",
            &self.allowed_purposes().collect::<Vec<_>>(),
        )?;
        s.serialize_field("max_vendor_id", &self.max_vendor_id())?;
        s.serialize_field("vendor_encoding", &self.vendor_encoding())?;
        s.serialize_field("vendor_consents", &vendor_consents)?;
        s.end()
    }
}
