//! Macros for ergonomic state declaration.

/// Declare a state enum, its shape enum, and the `State` implementation.
///
/// Each variant carries at most one payload. The shape enum has one unit
/// variant per state variant, with the same name.
///
/// # Example
///
/// ```
/// use tandem::core::State;
/// use tandem::state_enum;
///
/// state_enum! {
///     pub enum Upload {
///         Queued,
///         Sending(u64),
///         Done,
///         Failed(String),
///     }
///     shape: UploadShape
///     final: [Done, Failed]
///     error: [Failed]
/// }
///
/// assert_eq!(Upload::Sending(10).shape(), UploadShape::Sending);
/// assert_eq!(UploadShape::Failed.to_string(), "Failed");
/// assert!(Upload::Failed("timeout".into()).is_error());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( ( $payload:ty ) )?
            ),* $(,)?
        }

        shape: $shape:ident
        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $( ($payload) )?
            ),*
        }

        #[doc = concat!("Variant tags of [`", stringify!($name), "`], ignoring payload.")]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $shape {
            $($variant),*
        }

        impl ::std::fmt::Display for $shape {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let name = match self {
                    $(Self::$variant => stringify!($variant)),*
                };
                f.write_str(name)
            }
        }

        impl $crate::core::State for $name {
            type Shape = $shape;

            fn name(&self) -> &str {
                match self {
                    $(
                        $crate::__state_pattern!($name, $variant $(, $payload)?)
                            => stringify!($variant)
                    ),*
                }
            }

            fn shape(&self) -> $shape {
                match self {
                    $(
                        $crate::__state_pattern!($name, $variant $(, $payload)?)
                            => $shape::$variant
                    ),*
                }
            }

            fn shapes() -> &'static [$shape] {
                &[$($shape::$variant),*]
            }

            #[allow(unreachable_patterns)]
            fn is_final_shape(shape: $shape) -> bool {
                match shape {
                    $($($shape::$final => true,)*)?
                    _ => false,
                }
            }

            #[allow(unreachable_patterns)]
            fn is_error(&self) -> bool {
                match self.shape() {
                    $($($shape::$error => true,)*)?
                    _ => false,
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __state_pattern {
    ($name:ident, $variant:ident) => {
        $name::$variant
    };
    ($name:ident, $variant:ident, $payload:ty) => {
        $name::$variant(..)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::State;

    state_enum! {
        /// Lifecycle of a download.
        enum Download {
            Pending,
            Fetching(u32),
            Saved,
            /// Gave up.
            Aborted(String),
        }
        shape: DownloadShape
        final: [Saved, Aborted]
        error: [Aborted]
    }

    #[test]
    fn payload_is_ignored_by_shape_and_name() {
        let fetching = Download::Fetching(3);
        assert_eq!(fetching.name(), "Fetching");
        assert_eq!(fetching.shape(), DownloadShape::Fetching);
        assert_eq!(Download::Fetching(90).shape(), fetching.shape());
        assert_eq!(DownloadShape::Fetching.to_string(), "Fetching");
    }

    #[test]
    fn final_and_error_lists_drive_predicates() {
        assert!(!Download::Pending.is_final());
        assert!(!Download::Pending.is_error());
        assert!(Download::Saved.is_final());
        assert!(!Download::Saved.is_error());

        let aborted = Download::Aborted("disk full".to_string());
        assert!(aborted.is_final());
        assert!(aborted.is_error());
    }

    #[test]
    fn shapes_follow_declaration_order() {
        assert_eq!(
            Download::shapes(),
            &[
                DownloadShape::Pending,
                DownloadShape::Fetching,
                DownloadShape::Saved,
                DownloadShape::Aborted
            ]
        );
    }

    #[test]
    fn lists_are_optional() {
        state_enum! {
            pub(crate) enum Switch {
                Off,
                On(u8),
            }
            shape: SwitchShape
        }

        assert!(!Switch::On(1).is_final());
        assert!(!Switch::is_final_shape(SwitchShape::On));
        assert!(!Switch::Off.is_error());
    }

    #[test]
    fn states_round_trip_through_json() {
        let state = Download::Aborted("timeout".to_string());
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(serde_json::from_str::<Download>(&json).unwrap(), state);
    }
}
