//! `#[derive(Component)]`: picks a storage for a type without writing the
//! `impl Component for X { type Storage = ...; }` boilerplate by hand.
//!
//! ```ignore
//! #[derive(Component)]
//! struct Position(f32, f32);
//!
//! #[derive(Component)]
//! #[component(storage = "stable")]
//! struct BigAsset([u8; 4096]);
//!
//! #[derive(Component)]
//! #[component(storage = "empty")]
//! struct Tag;
//! ```
//!
//! `storage` accepts `"dense"` (default), `"stable"`, or `"empty"`; `"empty"`
//! is also inferred automatically for a unit struct with no attribute.
//! `page_size` overrides the sparse page size, defaulting to
//! `sparsecs::sparse_set::DEFAULT_PAGE_SIZE`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta, NestedMeta};

enum StorageKind {
    Dense,
    Stable,
    Empty,
}

fn parse_attrs(input: &DeriveInput) -> (StorageKind, Option<usize>) {
    let mut kind = None;
    let mut page_size = None;

    for attr in &input.attrs {
        if !attr.path.is_ident("component") {
            continue;
        }
        let meta = match attr.parse_meta() {
            Ok(Meta::List(list)) => list,
            _ => continue,
        };
        for nested in meta.nested {
            if let NestedMeta::Meta(Meta::NameValue(nv)) = nested {
                if nv.path.is_ident("storage") {
                    if let Lit::Str(s) = &nv.lit {
                        kind = Some(match s.value().as_str() {
                            "dense" => StorageKind::Dense,
                            "stable" => StorageKind::Stable,
                            "empty" => StorageKind::Empty,
                            other => panic!("unknown component storage kind `{}`", other),
                        });
                    }
                } else if nv.path.is_ident("page_size") {
                    if let Lit::Int(n) = &nv.lit {
                        page_size = Some(n.base10_parse::<usize>().expect("page_size must be an integer"));
                    }
                }
            }
        }
    }

    let is_unit = matches!(&input.data, Data::Struct(s) if matches!(s.fields, Fields::Unit));
    let kind = kind.unwrap_or(if is_unit { StorageKind::Empty } else { StorageKind::Dense });
    (kind, page_size)
}

/// Implements `sparsecs::storage::Component` for the annotated type.
#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (generics_impl, generics_ty, generics_where) = input.generics.split_for_impl();
    let (kind, page_size) = parse_attrs(&input);

    let storage_ty = match (kind, page_size) {
        (StorageKind::Dense, Some(p)) => quote! { ::sparsecs::storage::DenseStorage<#name #generics_ty, #p> },
        (StorageKind::Dense, None) => quote! { ::sparsecs::storage::DenseStorage<#name #generics_ty> },
        (StorageKind::Stable, Some(p)) => quote! { ::sparsecs::storage::StableStorage<#name #generics_ty, #p> },
        (StorageKind::Stable, None) => quote! { ::sparsecs::storage::StableStorage<#name #generics_ty> },
        (StorageKind::Empty, Some(p)) => quote! { ::sparsecs::storage::EmptyStorage<#name #generics_ty, #p> },
        (StorageKind::Empty, None) => quote! { ::sparsecs::storage::EmptyStorage<#name #generics_ty> },
    };

    let expanded = quote! {
        impl #generics_impl ::sparsecs::storage::Component for #name #generics_ty #generics_where {
            type Storage = #storage_ty;
        }
    };

    TokenStream::from(expanded)
}
