//! Opaque references to payment-provider objects.
//!
//! The provider hands back string identifiers (`ch_…`, `cus_…`, `price_…`,
//! `cs_…`). These newtypes keep the different reference kinds from being
//! mixed up in function signatures; the contents are never interpreted.

/// Macro to define an opaque string reference wrapper.
macro_rules! define_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a provider identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the reference and returns its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_ref! {
    /// A completed payment attempt (`ch_…`).
    ChargeRef
}

define_ref! {
    /// A provider-side customer object (`cus_…`).
    ///
    /// Once stored against a user profile this is the durable link between
    /// the application user and the provider's customer record.
    CustomerRef
}

define_ref! {
    /// A purchasable price (`price_…`), one-time or recurring.
    PriceRef
}

define_ref! {
    /// A hosted checkout session (`cs_…`).
    SessionRef
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refs_are_distinct_types() {
        // Compile-time property; just exercise construction and display.
        let charge = ChargeRef::new("ch_123");
        let customer = CustomerRef::new("cus_123");
        assert_eq!(charge.as_str(), "ch_123");
        assert_eq!(customer.to_string(), "cus_123");
    }

    #[test]
    fn test_ref_serde_transparent() {
        let price = PriceRef::new("price_A");
        let json = serde_json::to_string(&price).expect("serialize");
        assert_eq!(json, "\"price_A\"");
        let back: PriceRef = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, price);
    }
}
