//! Derive macro for bindable property tables.
//!
//! This crate provides the `#[derive(Bean)]` macro, which implements
//! `oxide_bind_core::property::Bean` for a struct so that its fields can be
//! bound by name, including through dotted paths into nested beans.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Generics, Lit, Meta,
    PathArguments, Type, parse_macro_input, parse_quote,
};

/// Derives the `Bean` trait for a struct with named fields.
///
/// Every field becomes a property whose value is a clone of the field.
///
/// # Field Attributes
///
/// - `#[property(name = "prop")]` - Binding name (defaults to the field name)
/// - `#[property(nullable)]` - The field is an `Option<T>`; `None` binds as a
///   null typed as `T`. Implied for fields declared as `Option<T>`
/// - `#[property(bean)]` - The field type is itself a `Bean`, so names like
///   `field.inner` descend into it
/// - `#[property(qualifier = "nvarchar")]` - Adds a qualifier to the declared
///   type; may be repeated
/// - `#[property(skip)]` - Leaves the field out
///
/// Type parameters get `'static + Send + Sync + Clone` bounds. Lifetime
/// parameters are rejected.
#[proc_macro_derive(Bean, attributes(property))]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_bean_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_bean_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Bean derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Bean derive only supports structs",
            ));
        }
    };

    let mut calls: Vec<TokenStream2> = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_property_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let property_name = attrs.name.unwrap_or_else(|| field_name.to_string());
        let nullable = attrs.nullable || is_option(&field.ty);
        let method = match (nullable, attrs.bean) {
            (false, false) => quote!(property),
            (true, false) => quote!(nullable),
            (false, true) => quote!(bean),
            (true, true) => quote!(nullable_bean),
        };

        calls.push(quote! {
            .#method(#property_name, |owner: &Self| {
                ::core::clone::Clone::clone(&owner.#field_name)
            })
        });
        for tag in &attrs.qualifiers {
            calls.push(quote! {
                .qualify(
                    #property_name,
                    ::oxide_bind_core::types::Qualifier::from_tag(#tag),
                )
            });
        }
    }

    let generics = bean_generics(&input.generics)?;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::oxide_bind_core::property::Bean
            for #struct_name #ty_generics #where_clause
        {
            fn property_table() -> ::oxide_bind_core::property::PropertyTable {
                ::oxide_bind_core::property::PropertyTable::builder::<Self>()
                    #(#calls)*
                    .build()
            }
        }
    })
}

/// Beans are stored behind `dyn Any`, so every type parameter must be
/// `'static + Send + Sync`, and fields are read by cloning.
fn bean_generics(generics: &Generics) -> syn::Result<Generics> {
    if let Some(lifetime) = generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Bean derive does not support lifetime parameters",
        ));
    }
    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!('static));
        param.bounds.push(parse_quote!(::core::marker::Send));
        param.bounds.push(parse_quote!(::core::marker::Sync));
        param.bounds.push(parse_quote!(::core::clone::Clone));
    }
    Ok(generics)
}

#[derive(Default)]
struct PropertyAttrs {
    name: Option<String>,
    nullable: bool,
    bean: bool,
    skip: bool,
    qualifiers: Vec<String>,
}

fn parse_property_attrs(attrs: &[Attribute]) -> syn::Result<PropertyAttrs> {
    let mut result = PropertyAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("property") {
            continue;
        }
        // Handle empty attribute like #[property]
        if matches!(attr.meta, Meta::Path(_)) {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("nullable") {
                result.nullable = true;
            } else if meta.path.is_ident("bean") {
                result.bean = true;
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("name") {
                result.name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("qualifier") {
                result.qualifiers.push(string_value(&meta)?);
            } else {
                return Err(meta.error("unknown property attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: Expr = meta.value()?.parse()?;
    match value {
        Expr::Lit(lit) => match lit.lit {
            Lit::Str(s) => Ok(s.value()),
            other => Err(syn::Error::new_spanned(other, "expected a string literal")),
        },
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.qself.is_none()
        && path.path.segments.last().is_some_and(|segment| {
            segment.ident == "Option"
                && matches!(
                    &segment.arguments,
                    PathArguments::AngleBracketed(args)
                        if args.args.len() == 1
                            && matches!(args.args.first(), Some(GenericArgument::Type(_)))
                )
        })
}
