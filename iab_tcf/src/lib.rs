//! This crate is an implementation of the IAB Europe Transparency & Consent Framework (TCF)
//! v1.1 [Vendor Consent String](https://github.com/InteractiveAdvertisingBureau/GDPR-Transparency-and-Consent-Framework/blob/master/Consent%20string%20and%20vendor%20list%20formats%20v1.1%20Final.md)
//! decoder.
//!
//! It decodes the header of a consent string and answers consent queries for purposes and
//! vendors, whichever encoding the vendor section uses.
//!
//! NOTE: This is not an official IAB library.
//!
//! # Parsing consent strings
//!
//! Consent strings are bit-packed binary payloads. They are usually transmitted as URL-safe
//! Base64 text, which [`decode_str`](v1::decode_str) turns back into bytes.
//!
//! The [`ConsentString`](v1::ConsentString) type borrows these bytes and gives access
//! to their content.
//!
//! ```
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use iab_tcf::v1::{ConsentString, ParseMode, decode_str};
//!
//! let bytes = decode_str("BOEFEAyOEFEAyAHABDENAI4AAAB9vABAASA")?;
//! let consent = ConsentString::parse(&bytes, ParseMode::Eager)?;
//!
//! println!("CMP {} version {}", consent.cmp_id(), consent.cmp_version());
//! println!("created at {}", consent.created());
//! # Ok(())
//! # }
//! ```
//!
//! # Checking consent
//!
//! The following example checks that a vendor (id 8) may store or access information on
//! the user's device (purpose 1).
//!
//! ```
//! # use std::error::Error;
//! #
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use iab_tcf::v1::{ParseMode, decode_str, parse};
//!
//! let bytes = decode_str("BOEFEAyOEFEAyAHABDENAI4AAAB9vABAASA")?;
//! let consent = parse(&bytes, ParseMode::Lazy)?;
//!
//! let has_user_consent = consent.purpose_allowed(1) && consent.vendor_allowed(8)?;
//!
//! assert!(has_user_consent);
//! # Ok(())
//! # }
//! ```
//!
//! # Error handling
//!
//! This crate is conservative with regard to how it handles parsing failure. A string whose
//! header cannot be fully decoded and validated is considered as an error.
//!
//! The vendor section is validated when parsing with [`ParseMode::Eager`](v1::ParseMode).
//! With [`ParseMode::Lazy`](v1::ParseMode), the range entries of the vendor section are only
//! validated when a vendor lookup reads them, and the lookup fails if they are malformed.
//!
//! # Features
//!
//! - `serde`: implements `Serialize` for the parsed consent string and its public types.
//!
pub(crate) mod core;
pub mod v1;
