//! Locale-aware string comparison for display ordering.
//!
//! City and artist names are compared with an explicit collator rather
//! than the ambient process locale: primary strength (case- and
//! accent-insensitive) with shifted alternate handling so punctuation
//! does not affect the order.

use std::cmp::Ordering;
use std::sync::OnceLock;

use icu::collator::options::{AlternateHandling, CollatorOptions, Strength};
use icu::collator::{Collator, CollatorBorrowed};
use icu::locale::Locale;

use crate::error::{Error, Result};

/// A collator bound to one locale.
pub struct Collation {
    collator: CollatorBorrowed<'static>,
}

impl Collation {
    /// Build a collation for a BCP-47 locale tag such as `pt-BR`.
    pub fn try_new(locale_tag: &str) -> Result<Self> {
        let locale: Locale = locale_tag
            .parse()
            .map_err(|_| Error::Config(format!("Invalid locale tag: {}", locale_tag)))?;

        let mut options = CollatorOptions::default();
        options.strength = Some(Strength::Primary);
        options.alternate_handling = Some(AlternateHandling::Shifted);

        let collator = Collator::try_new(locale.into(), options)
            .map_err(|e| Error::Config(format!("No collation data for {}: {}", locale_tag, e)))?;

        Ok(Self { collator })
    }

    /// The collation used for all show listings.
    pub fn pt_br() -> &'static Collation {
        static PT_BR: OnceLock<Collation> = OnceLock::new();
        PT_BR.get_or_init(|| {
            Collation::try_new("pt-BR").expect("pt-BR collation data is compiled in")
        })
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b)
    }
}
