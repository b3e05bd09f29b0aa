use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod id;

/// Derives `tenh::loom::dual::Id` for a marker type, making it usable as the identity tag
/// of fields, vector spaces and bases.
///
/// Supported attributes:
/// - `#[id(name = "...")]` overrides the label (defaults to the type's identifier).
/// - `#[id(crate = "...")]` overrides the path of the `tenh` crate.
#[proc_macro_derive(Id, attributes(id))]
pub fn derive_id(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let expanded = id::derive_id(input);
    expanded.into()
}
