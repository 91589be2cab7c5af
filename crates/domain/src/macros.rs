//! Macro for implementing Display and FromStr for configuration enums
//!
//! Configuration values arrive as strings from the environment. This macro
//! gives an enum a single lowercase string form used both for parsing and
//! for display.
//!
//! # Example
//!
//! ```rust
//! use idgate_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Stage {
//!     Alpha,
//!     Beta,
//! }
//!
//! impl_domain_enum_conversions!(Stage {
//!     Alpha => "alpha",
//!     Beta => "beta",
//! });
//!
//! assert_eq!("BETA".parse::<Stage>().unwrap(), Stage::Beta);
//! ```

/// Implements Display and FromStr traits for configuration enums
///
/// Parsing is case-insensitive; the error names the enum and the rejected
/// input.
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => ::std::write!(f, $str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        ::std::stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
