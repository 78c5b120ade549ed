//! A set of macros for easily working with internals.

/// Declares an integer-backed enum that keeps values it does not know about.
///
/// Unknown values deserialize into the `Unknown` variant instead of failing, so a payload from a
/// newer API version never drops an entity on the floor.
macro_rules! enum_number {
    (
        $(#[$outer:meta])*
        $vis:vis enum $Enum:ident {
            $(
                $(#[$vattr:meta])*
                $Variant:ident = $value:literal,
            )*
            _ => Unknown($T:ty),
        }
    ) => {
        $(#[$outer])*
        $vis enum $Enum {
            $(
                $(#[$vattr])*
                $Variant,
            )*
            /// Variant value is unknown.
            Unknown($T),
        }

        impl From<$T> for $Enum {
            fn from(value: $T) -> Self {
                match value {
                    $($value => Self::$Variant,)*
                    unknown => Self::Unknown(unknown),
                }
            }
        }

        impl From<$Enum> for $T {
            fn from(value: $Enum) -> Self {
                match value {
                    $($Enum::$Variant => $value,)*
                    $Enum::Unknown(unknown) => unknown,
                }
            }
        }
    };
}

/// Bails out of the current function with `$ret` when the given cache component is disabled.
macro_rules! gate {
    ($cache:expr, $component:expr) => {
        gate!($cache, $component, None)
    };
    ($cache:expr, $component:expr, $ret:expr) => {
        if !$cache.settings.is_enabled($component) {
            return $ret;
        }
    };
}
