use crate::core::{bit_len, is_set};
use crate::v1::metadata::Metadata;
use crate::v1::vendors::{VendorConsents, VendorSectionError};

/// Position of the consent bit of vendor 1.
const FIRST_VENDOR_BIT: usize = 173;

/// Vendor section holding one consent bit per vendor, from vendor 1 to the max vendor ID.
///
/// The bits are read from the borrowed consent string on every lookup.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BitField<'a> {
    data: &'a [u8],
    max_vendor_id: u16,
}

impl<'a> BitField<'a> {
    pub(crate) fn parse(metadata: &Metadata<'a>) -> Result<Self, VendorSectionError> {
        let data = metadata.data();
        let max_vendor_id = metadata.max_vendor_id();

        let needed = FIRST_VENDOR_BIT + usize::from(max_vendor_id);
        let available = bit_len(data);
        if needed > available {
            return Err(VendorSectionError::Truncated { needed, available });
        }

        Ok(Self {
            data,
            max_vendor_id,
        })
    }

    pub fn max_vendor_id(&self) -> u16 {
        self.max_vendor_id
    }
}

impl VendorConsents for BitField<'_> {
    fn is_vendor_allowed(&self, vendor_id: u16) -> Result<bool, VendorSectionError> {
        if vendor_id < 1 || vendor_id > self.max_vendor_id {
            return Ok(false);
        }

        Ok(is_set(
            self.data,
            FIRST_VENDOR_BIT + usize::from(vendor_id) - 1,
        )?)
    }
}
