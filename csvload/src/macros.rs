//! Shorthands for building [`crate::error::LoadError`] values at the call site.

/// Builds a [`crate::error::LoadError`] from a kind, a static description and an optional
/// detail rendered with [`ToString`].
///
/// Chain [`crate::error::LoadError::with_source`] to attach the originating error.
#[macro_export]
macro_rules! load_error {
    ($kind:expr, $desc:expr $(,)?) => {
        $crate::error::LoadError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr $(,)?) => {
        $crate::error::LoadError::from(($kind, $desc, ::std::string::ToString::to_string(&$detail)))
    };
}

/// Returns early with the [`crate::error::LoadError`] built by [`load_error!`] from the same
/// arguments.
#[macro_export]
macro_rules! bail {
    ($($args:tt)+) => {
        return ::core::result::Result::Err($crate::load_error!($($args)+))
    };
}
