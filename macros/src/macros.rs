//! Procedural macros for the eventbus crate.
//!
//! - `#[derive(Topic)]`: Implements `eventbus::Topic` for your type, preserving generics and bounds.
//!   Type parameters get `Send + Sync + 'static` bounds, which every topic needs.
//!   For enums, also generates `name()` returning the variant name.
//!
//! Usage:
//! ```rust,ignore
//! use eventbus::Topic;
//!
//! #[derive(Debug, Topic)]
//! struct Saved { path: String }
//!
//! #[derive(Debug, Topic)]
//! enum Session { Opened(u32), Closed { id: u32 } }
//! ```
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DeriveInput, Fields, parse_macro_input, parse_quote};

#[proc_macro_derive(Topic)]
pub fn derive_topic(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = input.ident.clone();
    let mut generics = input.generics.clone();

    let params: Vec<_> = generics.type_params().map(|p| p.ident.clone()).collect();
    if !params.is_empty() {
        let where_clause = generics.make_where_clause();
        for param in params {
            where_clause.predicates.push(parse_quote! {
                #param: ::std::marker::Send + ::std::marker::Sync + 'static
            });
        }
    }

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // Structs keep the default name(), which is the type name
    let name_impl = match &input.data {
        Data::Enum(data_enum) => variant_name_impl(data_enum),
        _ => quote! {},
    };

    let expanded = quote! {
        impl #impl_generics ::eventbus::Topic for #ident #ty_generics #where_clause {
            #name_impl
        }
    };
    TokenStream::from(expanded)
}

fn variant_name_impl(data_enum: &DataEnum) -> proc_macro2::TokenStream {
    let match_arms = data_enum.variants.iter().map(|variant| {
        let variant_ident = &variant.ident;
        let variant_name = variant_ident.to_string();

        let pattern = match &variant.fields {
            Fields::Unit => quote! { Self::#variant_ident },
            Fields::Unnamed(_) => quote! { Self::#variant_ident(..) },
            Fields::Named(_) => quote! { Self::#variant_ident { .. } },
        };

        quote! {
            #pattern => ::std::borrow::Cow::Borrowed(#variant_name)
        }
    });

    quote! {
        fn name(&self) -> ::std::borrow::Cow<'static, str> {
            match *self {
                #(#match_arms),*
            }
        }
    }
}
