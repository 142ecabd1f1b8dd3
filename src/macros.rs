#![allow(unused_macros)]

/// Helper macro for an out-of-bounds error
///
/// ```rust, ignore
/// if end > data.len() {
///     return Err(out_of_bounds_error!());
/// }
/// ```
macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// Helper macro for wrapping a failed section access into `CorruptData`
///
/// ```rust, ignore
/// let bytes = corrupt_on!(data.get(start..end), "typeDefinitions", start)?;
/// ```
macro_rules! corrupt_on {
    ($option:expr, $section:expr, $offset:expr) => {
        $option.ok_or(crate::Error::CorruptData {
            section: $section,
            offset: $offset,
        })
    };
}
