//! Core business logic - framework-agnostic operations over the database.
//!
//! Every function takes a `SeaORM` connection (or transaction) and returns the
//! crate [`Result`](crate::errors::Result). Nothing here knows about HTTP.

/// Declares a fieldless enum stored as a lowercase string column.
///
/// Generates serde names, `as_str`, `Display` and a `FromStr` whose error is a
/// validation error on the given field.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($field:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $($(#[$vmeta])* #[serde(rename = $value)] $variant),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stored and wire name of the variant
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::errors::Error;

            fn from_str(s: &str) -> $crate::errors::Result<Self> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err($crate::errors::Error::invalid_field(
                        $field,
                        format!("Unknown value '{other}'"),
                    )),
                }
            }
        }
    };
}
pub(crate) use string_enum;

pub mod auth;
pub mod catalog;
pub mod commission;
pub mod device_lock;
pub mod maintenance;
pub mod orders;
pub mod seed;
pub mod sequence;
pub mod settings;
pub mod shipping;

use crate::errors::{Error, Result};

string_enum! {
    /// Payment state of an order or a repair
    pub enum PaymentStatus("paymentStatus") {
        Pending => "pending",
        Paid => "paid",
        Refunded => "refunded",
    }
}

/// Rounds a monetary amount to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rejects negative and non-finite monetary amounts.
pub(crate) fn ensure_amount(value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidAmount { amount: value })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(30.0), 30.0);
        assert_eq!(round2(12.345), 12.35);
        assert_eq!(round2(0.004), 0.0);
    }

    #[test]
    fn test_string_enum_round_trips_names() {
        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().ok(), Some(*status));
        }
        assert!("settled".parse::<PaymentStatus>().is_err());
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
    }

    #[test]
    fn test_ensure_amount() {
        assert!(ensure_amount(0.0).is_ok());
        assert!(ensure_amount(-0.01).is_err());
        assert!(ensure_amount(f64::NAN).is_err());
        assert!(ensure_amount(f64::INFINITY).is_err());
    }
}
