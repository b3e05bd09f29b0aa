use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Fields, LitStr, Path, spanned::Spanned};

pub fn derive_id(input: DeriveInput) -> TokenStream {
    // tags carry no data: only unit structs and field-less enums qualify
    match &input.data {
        syn::Data::Struct(data_struct) => {
            if !matches!(data_struct.fields, Fields::Unit) {
                return syn::Error::new(
                    data_struct.fields.span(),
                    "`Id` can only be derived for unit structs",
                )
                .to_compile_error();
            }
        }
        syn::Data::Enum(data_enum) => {
            if data_enum
                .variants
                .iter()
                .any(|variant| !matches!(variant.fields, Fields::Unit))
            {
                return syn::Error::new(
                    data_enum.variants.span(),
                    "`Id` can only be derived for enums without fields",
                )
                .to_compile_error();
            }
        }
        syn::Data::Union(_) => {
            return syn::Error::new(input.span(), "`Id` cannot be derived for unions")
                .to_compile_error();
        }
    }

    let name = input.ident;

    // parse id attributes
    let mut crate_name = None;
    let mut label = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("id") {
            continue;
        }

        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let value = meta.value()?;
                let s: LitStr = value.parse()?;
                crate_name = Some(s.parse::<Path>()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                let value = meta.value()?;
                let s: LitStr = value.parse()?;
                if s.value().is_empty() {
                    return Err(meta.error("id name must not be empty"));
                }
                label = Some(s);
                Ok(())
            } else {
                Err(meta.error("unexpected attribute; supported are `crate` and `name`"))
            }
        });

        if let Err(err) = result {
            return err.to_compile_error();
        }
    }
    // determine the base path for trait implementation
    let base_path = match crate_name {
        Some(path) => quote!(#path::loom::dual),
        None => quote!(::tenh::loom::dual),
    };
    let label = label.unwrap_or_else(|| LitStr::new(&name.to_string(), name.span()));

    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    quote! {
        impl #impl_generics #base_path::Id for #name #ty_generics #where_clause {
            const NAME: &'static str = #label;
        }
    }
}
