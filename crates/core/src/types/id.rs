//! Newtype IDs for type-safe entity references.
//!
//! Every record in the hosted data store is keyed by a UUID. The `define_id!`
//! macro wraps that UUID per entity so a `ProductId` can never be passed where
//! a `SewingStyleId` is expected.

/// Macro to define a type-safe ID wrapper around [`uuid::Uuid`].
///
/// Creates a newtype with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]` (hyphenated string)
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()`, `random()`, `as_uuid()`
/// - `Display`, `FromStr`, `From<Uuid>` and `Into<Uuid>`
///
/// # Example
///
/// ```rust
/// # use dowslakers_core::define_id;
/// define_id!(InvoiceId);
/// define_id!(ReceiptId);
///
/// let invoice = InvoiceId::random();
/// let parsed: InvoiceId = invoice.to_string().parse().unwrap();
/// assert_eq!(invoice, parsed);
///
/// // These are different types, so this won't compile:
/// // let _: ReceiptId = invoice;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random (v4) ID.
            #[must_use]
            pub fn random() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(CategoryId);
define_id!(SewingStyleId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(OrderDetailId);
define_id!(WishlistEntryId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_string() {
        let raw = "6f1c1f8e-54a7-4f3f-9a57-0f1a8c2b9d10";
        let id: ProductId = raw.parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{raw}\""));

        let back: ProductId = serde_json::from_str(&format!("\"{raw}\"")).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_rejects_non_uuid() {
        assert!("not-a-uuid".parse::<OrderId>().is_err());
        assert!(serde_json::from_str::<OrderId>("42").is_err());
    }
}
