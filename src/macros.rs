//! Convenience macros.

/// Build an [`Attributes`](crate::Attributes) map from `key => value` pairs.
///
/// Values go through `serde_json::json!`, so literals, expressions, and
/// `null` all work:
///
/// ```
/// use registrar::attrs;
///
/// let attributes = attrs! {
///     "name" => "Ada",
///     "age" => 36,
///     "email" => null,
/// };
/// assert_eq!(attributes.len(), 3);
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($key:literal => $value:tt),+ $(,)?) => {{
        let mut map = $crate::Attributes::new();
        $(
            map.insert($key.to_string(), $crate::serde_json::json!($value));
        )+
        map
    }};
}
