//! Macros for closed name enums and call-site parameters
//!
//! # Example
//!
//! ```rust
//! use cacheward_domain::{impl_name_conversions, params};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Tier {
//!     Hot,
//!     Cold,
//! }
//!
//! impl_name_conversions!(Tier {
//!     Hot => "hot",
//!     Cold => "cold",
//! });
//!
//! assert_eq!(Tier::ALL.len(), 2);
//! assert_eq!("HOT".parse::<Tier>().unwrap(), Tier::Hot);
//!
//! let args = params! { "user_id" => 42, "channel" => "sms" };
//! assert_eq!(args.len(), 2);
//! ```

/// Implements `as_str`, `ALL`, Display and FromStr for a closed name enum
///
/// This macro generates:
/// - `as_str()`: the canonical lowercase name
/// - `ALL`: every variant, in declaration order
/// - Display: writes the canonical name
/// - FromStr: case-insensitive parse, failing with
///   [`CachewardError::InvalidInput`](crate::errors::CachewardError)
#[macro_export]
macro_rules! impl_name_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$enum_name] = &[$(Self::$variant),+];

            /// Canonical name
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::errors::CachewardError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err($crate::errors::CachewardError::InvalidInput(format!(
                        "Invalid {}: {}",
                        stringify!($enum_name),
                        s
                    ))),
                }
            }
        }
    };
}

/// Builds [`Params`](crate::params::Params) from `name => value` pairs
#[macro_export]
macro_rules! params {
    () => {
        $crate::params::Params::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::params::Params::new()$(.with($name, $value))+
    };
}
