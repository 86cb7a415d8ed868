//! Attribute macros for sprig-rs. Put `#[intercepted]` on a bean's capability trait so
//! benchmark-marked beans can be published behind it without a hand-written decorator.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, parse_quote, FnArg, Ident, ItemTrait, Pat, TraitItem};

/// Emits the trait unchanged plus `impl<Target: Trait> Trait for Intercepted<Target>`,
/// forwarding every method through `Intercepted::invoke` (or `invoke_mut` for `&mut self`).
/// Requires `Intercepted` to be in scope (e.g. `use sprig_rs::Intercepted`).
#[proc_macro_attribute]
pub fn intercepted(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        let attr = proc_macro2::TokenStream::from(attr);
        return syn::Error::new_spanned(attr, "#[intercepted] takes no arguments")
            .to_compile_error()
            .into();
    }
    let item = parse_macro_input!(item as ItemTrait);
    match expand(&item) {
        Ok(forwarding) => TokenStream::from(quote! {
            #item
            #forwarding
        }),
        Err(err) => {
            let err = err.to_compile_error();
            TokenStream::from(quote! {
                #item
                #err
            })
        }
    }
}

fn expand(item: &ItemTrait) -> syn::Result<proc_macro2::TokenStream> {
    let trait_ident = &item.ident;
    let target = Ident::new("__SprigTarget", Span::call_site());
    let (_, ty_generics, _) = item.generics.split_for_impl();

    let mut generics = item.generics.clone();
    generics
        .params
        .push(parse_quote!(#target: #trait_ident #ty_generics));
    let (impl_generics, _, where_clause) = generics.split_for_impl();

    let mut methods = Vec::new();
    for trait_item in &item.items {
        let method = match trait_item {
            TraitItem::Fn(method) => method,
            TraitItem::Type(ty) => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "#[intercepted] traits cannot have associated types",
                ))
            }
            TraitItem::Const(c) => {
                return Err(syn::Error::new_spanned(
                    c,
                    "#[intercepted] traits cannot have associated consts",
                ))
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported item in #[intercepted] trait",
                ))
            }
        };
        let sig = &method.sig;
        if let Some(asyncness) = &sig.asyncness {
            return Err(syn::Error::new_spanned(
                asyncness,
                "async methods cannot be intercepted",
            ));
        }
        let receiver = sig.receiver().ok_or_else(|| {
            syn::Error::new_spanned(sig, "methods without a receiver cannot be intercepted")
        })?;
        if receiver.reference.is_none() {
            return Err(syn::Error::new_spanned(
                receiver,
                "by-value receivers cannot be intercepted; use &self or &mut self",
            ));
        }
        let invoke = if receiver.mutability.is_some() {
            quote!(invoke_mut)
        } else {
            quote!(invoke)
        };

        let mut args = Vec::new();
        for input in sig.inputs.iter().skip(1) {
            let FnArg::Typed(typed) = input else {
                continue;
            };
            match typed.pat.as_ref() {
                Pat::Ident(pat) if pat.subpat.is_none() => args.push(pat.ident.clone()),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "#[intercepted] methods need plain identifier arguments",
                    ))
                }
            }
        }

        let ident = &sig.ident;
        let name = ident.to_string();
        methods.push(quote! {
            #sig {
                self.#invoke(#name, move |__sprig_target| __sprig_target.#ident(#(#args),*))
            }
        });
    }

    Ok(quote! {
        impl #impl_generics #trait_ident #ty_generics for Intercepted<#target> #where_clause {
            #(#methods)*
        }
    })
}
