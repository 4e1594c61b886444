//! Phone number format rules.
//!
//! Each supported locale is a [`PhoneFormat`]; [`PhoneValidator`] accepts a
//! number when any registered format does.

use lazy_static::lazy_static;
use regex::Regex;

pub trait PhoneFormat: Send + Sync {
    /// ISO 3166 region code, used in logs.
    fn region(&self) -> &'static str;

    fn matches(&self, phone: &str) -> bool;
}

/// Indian mobile numbers: `+91` then ten digits, the first of which is 6-9.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndianMobile;

impl PhoneFormat for IndianMobile {
    fn region(&self) -> &'static str {
        "IN"
    }

    fn matches(&self, phone: &str) -> bool {
        lazy_static! {
            static ref IN_MOBILE_RE: Regex = Regex::new(r"^\+91[6-9][0-9]{9}$").unwrap();
        }
        IN_MOBILE_RE.is_match(phone)
    }
}

pub struct PhoneValidator {
    formats: Vec<Box<dyn PhoneFormat>>,
}

impl PhoneValidator {
    pub fn new(formats: Vec<Box<dyn PhoneFormat>>) -> Self {
        Self { formats }
    }

    pub fn with_format(mut self, format: impl PhoneFormat + 'static) -> Self {
        self.formats.push(Box::new(format));
        self
    }

    /// Region of the first format accepting `phone`, if any.
    pub fn region_of(&self, phone: &str) -> Option<&'static str> {
        self.formats
            .iter()
            .find(|f| f.matches(phone))
            .map(|f| f.region())
    }

    pub fn is_valid(&self, phone: &str) -> bool {
        self.region_of(phone).is_some()
    }
}

impl Default for PhoneValidator {
    fn default() -> Self {
        Self::new(vec![Box::new(IndianMobile)])
    }
}
