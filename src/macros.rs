//! Declarative helpers for keyword tables and enumerated values.
//!
//! [`keywords!`] declares the keyword set of one container: a `Copy` enum
//! with one variant per keyword, the keyword text of each variant, and a
//! reverse lookup through a `phf` map built at compile time.
//!
//! [`ccsds_enum!`] declares an enumerated field value (such as `ATTITUDE_DIR`
//! or `TIME_SYSTEM`) together with its [`Enumerated`](crate::token::Enumerated)
//! implementation, so tokens can be parsed straight into it.
//!
//! [`commented!`] wires a container's `comments` field to the comment lock.

macro_rules! keywords {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident => $text:tt ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant ),*
        }

        #[allow(dead_code)]
        impl $name {
            /// Every keyword of the table, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),* ];

            /// Keyword text as it appears in KVN and XML.
            pub const fn keyword(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),*
                }
            }

            /// Looks up a keyword.
            pub fn from_keyword(keyword: &str) -> Option<Self> {
                static TABLE: phf::Map<&'static str, $name> = phf::phf_map! {
                    $( $text => $name::$variant ),*
                };
                TABLE.get(keyword).copied()
            }
        }
    };
}

macro_rules! ccsds_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:tt ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),*
        }

        impl $crate::token::Enumerated for $name {
            const KIND: &'static str = stringify!($name);

            fn from_value(value: &str) -> Option<Self> {
                match value.to_ascii_uppercase().as_str() {
                    $( $text => Some($name::$variant), )*
                    _ => None,
                }
            }

            fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::token::Enumerated::as_str(*self))
            }
        }

        impl $crate::approx::ApproxEq for $name {
            fn approx_eq(&self, other: &Self) -> bool {
                self == other
            }
        }
    };
}

/// Implements [`Commented`](crate::container::Commented) for containers
/// holding their comments in a `comments: Vec<String>` field.
macro_rules! commented {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::container::Commented for $t {
                fn comments(&self) -> &[String] {
                    &self.comments
                }

                fn comments_mut(&mut self) -> &mut Vec<String> {
                    &mut self.comments
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use crate::token::Enumerated;

    keywords! {
        enum Color {
            Red => "RED",
            DarkBlue => "DARK_BLUE",
        }
    }

    ccsds_enum! {
        enum Spin {
            Up => "UP",
            Down => "DOWN",
        }
    }

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Color::from_keyword("RED"), Some(Color::Red));
        assert_eq!(Color::from_keyword("DARK_BLUE"), Some(Color::DarkBlue));
        assert_eq!(Color::from_keyword("dark_blue"), None);
        assert_eq!(Color::DarkBlue.keyword(), "DARK_BLUE");
        assert_eq!(Color::ALL.len(), 2);
    }

    #[test]
    fn test_enumerated_values() {
        assert_eq!(Spin::from_value("up"), Some(Spin::Up));
        assert_eq!(Spin::from_value("DOWN"), Some(Spin::Down));
        assert_eq!(Spin::from_value("SIDEWAYS"), None);
        assert_eq!(Spin::Down.to_string(), "DOWN");
        assert_eq!(Spin::KIND, "Spin");
    }
}
