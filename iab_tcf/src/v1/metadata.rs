//! Fixed-layout header of a v1.1 consent string.
//!
//! | field               | bits    |
//! |---------------------|---------|
//! | version             | 0-5     |
//! | created             | 6-41    |
//! | last updated        | 42-77   |
//! | cmp id              | 78-89   |
//! | cmp version         | 90-101  |
//! | consent screen      | 102-107 |
//! | consent language    | 108-119 |
//! | vendor list version | 120-131 |
//! | purposes allowed    | 132-155 |
//! | max vendor id       | 156-171 |
//!
use crate::core::DataReader;
use crate::v1::ConsentDecodeError;

/// Minimum length in bytes of a consent string, enough to hold every header field.
pub const MIN_CONSENT_STRING_LEN: usize = 22;

/// Number of purposes defined by TCF v1.1.
pub const PURPOSES_COUNT: u8 = 24;

/// Validated header of a consent string.
///
/// The header fields are decoded once by [`Metadata::parse`]; the underlying buffer stays
/// borrowed so that the vendor section can be read from it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Metadata<'a> {
    data: &'a [u8],
    version: u8,
    created: u64,
    last_updated: u64,
    cmp_id: u16,
    cmp_version: u16,
    consent_screen: u8,
    consent_language: [u8; 2],
    vendor_list_version: u16,
    purposes_allowed: u32,
    max_vendor_id: u16,
}

impl<'a> Metadata<'a> {
    /// Decodes and validates the header of a consent string.
    ///
    /// # Errors
    ///
    /// - [`ConsentDecodeError::TooShort`] if `data` is shorter than [`MIN_CONSENT_STRING_LEN`].
    /// - [`ConsentDecodeError::InvalidMaxVendorId`] if the max vendor ID is 0.
    /// - [`ConsentDecodeError::InvalidVersion`] if the version is 0.
    /// - [`ConsentDecodeError::InvalidVendorListVersion`] if the vendor list version is 0.
    ///
    pub fn parse(data: &'a [u8]) -> Result<Self, ConsentDecodeError> {
        if data.len() < MIN_CONSENT_STRING_LEN {
            return Err(ConsentDecodeError::TooShort { len: data.len() });
        }

        let mut r = DataReader::new(data);
        let version = r.read_fixed_integer(6)?;
        let created = r.read_datetime_as_deciseconds()?;
        let last_updated = r.read_datetime_as_deciseconds()?;
        let cmp_id = r.read_fixed_integer(12)?;
        let cmp_version = r.read_fixed_integer(12)?;
        let consent_screen = r.read_fixed_integer(6)?;
        let consent_language = [r.read_fixed_integer(6)?, r.read_fixed_integer(6)?];
        let vendor_list_version = r.read_fixed_integer(12)?;
        let purposes_allowed = r.read_fixed_integer(u32::from(PURPOSES_COUNT))?;
        let max_vendor_id = r.read_fixed_integer(16)?;

        if max_vendor_id < 1 {
            return Err(ConsentDecodeError::InvalidMaxVendorId {
                found: max_vendor_id,
            });
        }
        if version < 1 {
            return Err(ConsentDecodeError::InvalidVersion { found: version });
        }
        if vendor_list_version == 0 {
            return Err(ConsentDecodeError::InvalidVendorListVersion);
        }

        Ok(Self {
            data,
            version,
            created,
            last_updated,
            cmp_id,
            cmp_version,
            consent_screen,
            consent_language,
            vendor_list_version,
            purposes_allowed,
            max_vendor_id,
        })
    }

    pub(crate) fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Creation time, in seconds since the Unix epoch.
    pub fn created(&self) -> i64 {
        (self.created / 10) as i64
    }

    /// Creation time as encoded, in deciseconds since the Unix epoch.
    pub fn created_deciseconds(&self) -> u64 {
        self.created
    }

    /// Last update time, in seconds since the Unix epoch.
    pub fn last_updated(&self) -> i64 {
        (self.last_updated / 10) as i64
    }

    /// Last update time as encoded, in deciseconds since the Unix epoch.
    pub fn last_updated_deciseconds(&self) -> u64 {
        self.last_updated
    }

    pub fn cmp_id(&self) -> u16 {
        self.cmp_id
    }

    pub fn cmp_version(&self) -> u16 {
        self.cmp_version
    }

    pub fn consent_screen(&self) -> u8 {
        self.consent_screen
    }

    /// Two letter language code, such as `EN`.
    pub fn consent_language(&self) -> String {
        self.consent_language
            .iter()
            .map(|&n| (n + b'A') as char)
            .collect()
    }

    pub fn vendor_list_version(&self) -> u16 {
        self.vendor_list_version
    }

    pub fn max_vendor_id(&self) -> u16 {
        self.max_vendor_id
    }

    /// Returns whether the user allowed the given purpose.
    ///
    /// Only IDs 1 to 24 are defined, any other ID is reported as not allowed.
    pub fn purpose_allowed(&self, purpose_id: u8) -> bool {
        (1..=PURPOSES_COUNT).contains(&purpose_id)
            && self.purposes_allowed & (1 << (PURPOSES_COUNT - purpose_id)) != 0
    }

    /// Iterates over the IDs of all allowed purposes, in ascending order.
    pub fn allowed_purposes(&self) -> impl Iterator<Item = u8> + use<'a> {
        let metadata = *self;
        (1..=PURPOSES_COUNT).filter(move |&id| metadata.purpose_allowed(id))
    }
}
