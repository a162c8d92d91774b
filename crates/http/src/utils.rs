//! Helper macros used across the crate.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Like `assert!`, but for conditions the caller reports as an `Err` instead of a panic.
///
/// ```ignore
/// ensure!(!buf.is_full(), ParseError::too_large(buf.capacity()));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
