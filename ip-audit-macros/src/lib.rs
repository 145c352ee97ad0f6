use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields, LitStr, Meta};

/// Implements `ip_audit::AttributeStore` for a struct.
///
/// Only fields marked `#[attribute]` are exposed, under their own name or the one given with
/// `#[attribute(name = "column")]`. Their types must implement `ip_audit::AttributeField`.
#[proc_macro_derive(AttributeStore, attributes(attribute))]
pub fn derive_attribute_store(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(DataStruct {
        fields: Fields::Named(fields),
        ..
    }) = &input.data
    else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "AttributeStore can only be derived for structs with named fields",
        ));
    };

    let mut getters = Vec::new();
    let mut setters = Vec::new();

    for field in &fields.named {
        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("attribute")) else {
            continue;
        };
        let Some(ident) = &field.ident else {
            continue;
        };

        let mut name = LitStr::new(&ident.to_string(), ident.span());
        if let Meta::List(_) = &attr.meta {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    name = meta.value()?.parse()?;
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"`"))
                }
            })?;
        }

        getters.push(quote! {
            #name => ::ip_audit::AttributeField::to_attribute(&self.#ident),
        });
        setters.push(quote! {
            #name => ::ip_audit::AttributeField::assign(&mut self.#ident, value),
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::ip_audit::AttributeStore for #ident #ty_generics #where_clause {
            fn attribute(&self, name: &str) -> ::core::option::Option<::ip_audit::AttributeValue> {
                match name {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_attribute(
                &mut self,
                name: &str,
                value: ::core::option::Option<::ip_audit::AttributeValue>,
            ) {
                match name {
                    #(#setters)*
                    _ => drop(value),
                }
            }
        }
    })
}
