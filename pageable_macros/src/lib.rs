mod queryable;

use proc_macro::TokenStream;

/// Derive `pageable::Queryable` for a struct with named fields.
///
/// Each field becomes an attribute named after the field, converted with
/// `pageable::Value::from`. Field types must implement `Clone` and
/// `Into<pageable::Value>`.
///
/// ```ignore
/// #[derive(Clone, Queryable)]
/// struct Customer {
///     #[queryable(natural)]
///     name: String,
///     #[queryable(rename = "years")]
///     age: i64,
///     #[queryable(skip)]
///     notes: Vec<u8>,
/// }
/// ```
///
/// - `#[queryable(skip)]` leaves the field out.
/// - `#[queryable(rename = "...")]` exposes the field under another name.
/// - `#[queryable(natural)]` makes the field the item's natural value, used
///   by sort orders without keys. At most one field may carry it.
#[proc_macro_derive(Queryable, attributes(queryable))]
pub fn derive_queryable(input: TokenStream) -> TokenStream {
    queryable::derive_queryable(input)
}
