use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr};

struct QueryField {
    ident: Ident,
    name: String,
    natural: bool,
}

pub fn derive_queryable(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Queryable can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Queryable can only be derived for structs",
            ))
        }
    };

    let mut exposed = Vec::new();
    for field in fields {
        if let Some(parsed) = parse_field(field)? {
            exposed.push(parsed);
        }
    }

    let naturals: Vec<&QueryField> = exposed.iter().filter(|f| f.natural).collect();
    if naturals.len() > 1 {
        return Err(syn::Error::new_spanned(
            &naturals[1].ident,
            "only one field can be marked #[queryable(natural)]",
        ));
    }

    let arms = exposed.iter().map(|field| {
        let ident = &field.ident;
        let attribute = &field.name;
        quote! {
            #attribute => ::pageable::Value::from(::core::clone::Clone::clone(&self.#ident)),
        }
    });

    let natural_value = naturals.first().map(|field| {
        let ident = &field.ident;
        quote! {
            fn natural_value(&self) -> ::pageable::Value {
                ::pageable::Value::from(::core::clone::Clone::clone(&self.#ident))
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::pageable::Queryable for #name #ty_generics #where_clause {
            fn attribute(&self, name: &str) -> ::pageable::Value {
                match name {
                    #(#arms)*
                    _ => ::pageable::Value::Null,
                }
            }

            #natural_value
        }
    })
}

/// `None` for skipped fields.
fn parse_field(field: &Field) -> syn::Result<Option<QueryField>> {
    let Some(ident) = field.ident.clone() else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };

    let mut skip = false;
    let mut natural = false;
    let mut rename = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("queryable") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
            } else if meta.path.is_ident("natural") {
                natural = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
            } else {
                return Err(meta.error("expected `skip`, `natural` or `rename = \"...\"`"));
            }
            Ok(())
        })?;
    }

    if skip {
        if natural {
            return Err(syn::Error::new_spanned(
                &ident,
                "a skipped field cannot be the natural value",
            ));
        }
        return Ok(None);
    }

    let name = rename.unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
    Ok(Some(QueryField {
        ident,
        name,
        natural,
    }))
}
