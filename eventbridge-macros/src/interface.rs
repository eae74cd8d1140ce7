//! `#[event_interface]`: typed adapters for Rust traits.
//!
//! The trait is kept as written. Next to it the macro emits a
//! `<Trait>Adapter` newtype with a static interface descriptor, whose trait
//! methods call the adapter's method slots in declaration order.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    FnArg, GenericArgument, Ident, ItemTrait, LitStr, PathArguments, ReturnType, Token, TraitItem,
    TraitItemFn, Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments for `#[event_interface(...)]`.
pub(crate) struct InterfaceArgs {
    pub name: Option<String>,
    pub adapter: Option<Ident>,
}

impl Parse for InterfaceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut adapter = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
                }
                "adapter" => {
                    adapter = Some(input.parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(InterfaceArgs { name, adapter })
    }
}

/// Arguments for `#[event(...)]` on a trait method.
struct EventArgs {
    name: Option<String>,
}

impl Parse for EventArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(EventArgs { name })
    }
}

// ============================================================================
// Type mapping
// ============================================================================

const PRIMITIVES: &[(&str, &str)] = &[
    ("bool", "Boolean"),
    ("i8", "Byte"),
    ("u8", "Byte"),
    ("i16", "Short"),
    ("u16", "Short"),
    ("char", "Char"),
    ("i32", "Int"),
    ("u32", "Int"),
    ("i64", "Long"),
    ("u64", "Long"),
    ("isize", "Long"),
    ("usize", "Long"),
    ("f32", "Float"),
    ("f64", "Double"),
];

/// Wrapper class names for primitives carried inside `Option`.
const BOXED: &[(&str, &str)] = &[
    ("bool", "java.lang.Boolean"),
    ("i8", "java.lang.Byte"),
    ("u8", "java.lang.Byte"),
    ("i16", "java.lang.Short"),
    ("u16", "java.lang.Short"),
    ("char", "java.lang.Character"),
    ("i32", "java.lang.Integer"),
    ("u32", "java.lang.Integer"),
    ("i64", "java.lang.Long"),
    ("u64", "java.lang.Long"),
    ("isize", "java.lang.Long"),
    ("usize", "java.lang.Long"),
    ("f32", "java.lang.Float"),
    ("f64", "java.lang.Double"),
];

/// Integer kinds with no lossless conversion into `Value`.
const UNCONVERTIBLE: &[&str] = &["u64", "isize", "usize"];

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn primitive(ty: &Type) -> Option<&'static str> {
    let segment = last_segment(ty)?;
    if !segment.arguments.is_none() {
        return None;
    }
    let ident = segment.ident.to_string();
    PRIMITIVES
        .iter()
        .find(|(rust, _)| *rust == ident)
        .map(|(_, keyword)| *keyword)
}

/// `Option<T>` → `T`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident != "Option" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn boxed(ty: &Type) -> Option<&'static str> {
    primitive(ty)?;
    let ident = last_segment(ty)?.ident.to_string();
    BOXED
        .iter()
        .find(|(rust, _)| *rust == ident)
        .map(|(_, class)| *class)
}

fn is_str(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == "str")
}

/// Reject parameter types with no conversion into `Value`.
fn check_param(ty: &Type) -> syn::Result<()> {
    if let Type::Reference(reference) = ty {
        if is_str(&reference.elem) {
            return Ok(());
        }
        return Err(syn::Error::new_spanned(
            ty,
            "only `&str` may be borrowed; take this parameter by value",
        ));
    }
    if let Some(inner) = option_inner(ty) {
        let unconvertible = primitive(inner).is_some()
            && last_segment(inner)
                .is_some_and(|segment| UNCONVERTIBLE.iter().any(|name| segment.ident == *name));
        if unconvertible {
            return Err(syn::Error::new_spanned(
                inner,
                "this integer type has no lossless conversion into `Value`; use `i64` or smaller",
            ));
        }
        return check_param(inner);
    }
    Ok(())
}

fn is_value(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == "Value")
}

/// Interface-level name of a reference type.
fn reference_name(ty: &Type) -> String {
    if let Type::Reference(reference) = ty {
        return reference_name(&reference.elem);
    }
    if let Some(inner) = option_inner(ty) {
        if let Some(class) = boxed(inner) {
            return class.to_owned();
        }
        return reference_name(inner);
    }
    match last_segment(ty).map(|segment| segment.ident.to_string()).as_deref() {
        Some("String" | "str") => "java.lang.String".to_owned(),
        Some("Value") => "java.lang.Object".to_owned(),
        Some("Vec") => "java.util.List".to_owned(),
        Some("BTreeMap" | "HashMap") => "java.util.Map".to_owned(),
        _ => quote!(#ty).to_string().replace(' ', ""),
    }
}

fn reference_type(ty: &Type) -> TokenStream2 {
    let name = reference_name(ty);
    quote! { ::eventbridge::TypeRef::reference(#name) }
}

fn return_type(output: &ReturnType) -> syn::Result<(TokenStream2, TokenStream2)> {
    let ty = match output {
        ReturnType::Default => return Ok((quote! { () }, quote! { ::eventbridge::TypeRef::Void })),
        ReturnType::Type(_, ty) => ty,
    };

    if matches!(&**ty, Type::Tuple(tuple) if tuple.elems.is_empty()) {
        return Ok((quote! { () }, quote! { ::eventbridge::TypeRef::Void }));
    }

    if let Some(keyword) = primitive(ty) {
        let variant = Ident::new(keyword, proc_macro2::Span::call_site());
        return Ok((
            quote! { #ty },
            quote! { ::eventbridge::TypeRef::from(::eventbridge::Primitive::#variant) },
        ));
    }

    if option_inner(ty).is_some() || is_value(ty) {
        return Ok((quote! { #ty }, reference_type(ty)));
    }

    Err(syn::Error::new_spanned(
        ty,
        "reference return types must be `Option<T>` or `Value`: adapters return null for them",
    ))
}

// ============================================================================
// Expansion
// ============================================================================

struct Slot {
    method: TraitItemFn,
    event: String,
    param_types: Vec<Type>,
    rust_ret: TokenStream2,
    interface_ret: TokenStream2,
}

fn take_event_name(method: &mut TraitItemFn) -> syn::Result<String> {
    let mut event = None;
    let mut kept = Vec::with_capacity(method.attrs.len());
    for attr in method.attrs.drain(..) {
        if attr.path().is_ident("event") {
            let args: EventArgs = attr.parse_args()?;
            event = args.name;
        } else {
            kept.push(attr);
        }
    }
    method.attrs = kept;
    Ok(event.unwrap_or_else(|| method.sig.ident.to_string()))
}

fn slot(interface: &str, method: &mut TraitItemFn) -> syn::Result<Slot> {
    let event = take_event_name(method)?;
    let sig = &method.sig;

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, "interface methods cannot be async"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "interface methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "interface methods must take `&self`",
            ));
        }
    }

    let mut param_types = Vec::new();
    for (index, arg) in inputs.enumerate() {
        let FnArg::Typed(pat_type) = arg else {
            return Err(syn::Error::new_spanned(arg, "unexpected receiver"));
        };
        if let Some(keyword) = primitive(&pat_type.ty) {
            return Err(syn::Error::new_spanned(
                &pat_type.ty,
                format!(
                    "parameter {index} of {interface}.{event} has primitive type `{keyword}`; \
                     primitive event parameters are not supported"
                ),
            ));
        }
        check_param(&pat_type.ty)?;
        param_types.push((*pat_type.ty).clone());
    }

    let (rust_ret, interface_ret) = return_type(&sig.output)?;

    Ok(Slot {
        method: method.clone(),
        event,
        param_types,
        rust_ret,
        interface_ret,
    })
}

fn expand(args: InterfaceArgs, mut item: ItemTrait) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[event_interface] traits cannot be generic",
        ));
    }

    let trait_name = item.ident.clone();
    let vis = item.vis.clone();
    let interface = args.name.unwrap_or_else(|| trait_name.to_string());
    let adapter = args
        .adapter
        .unwrap_or_else(|| format_ident!("{}Adapter", trait_name));

    let mut slots = Vec::new();
    for trait_item in &mut item.items {
        match trait_item {
            TraitItem::Fn(method) => slots.push(slot(&interface, method)?),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "#[event_interface] traits may only declare methods",
                ));
            }
        }
    }

    let methods = slots.iter().map(|slot| {
        let event = &slot.event;
        let params = slot.param_types.iter().map(reference_type);
        let ret = &slot.interface_ret;
        quote! {
            .method(
                ::eventbridge::MethodSignature::new(#event)
                    #(.param(#params))*
                    .returns(#ret)
            )
        }
    });

    let impls = slots.iter().enumerate().map(|(index, slot)| {
        let sig = &slot.method.sig;
        let ident = &sig.ident;
        let args: Vec<_> = (0..slot.param_types.len())
            .map(|i| format_ident!("__arg_{}", i))
            .collect();
        let types = &slot.param_types;
        let ret = &slot.rust_ret;
        quote! {
            fn #ident(&self, #(#args: #types),*) -> #ret {
                let __args = ::std::vec![#(::eventbridge::Value::from(#args)),*];
                let __result = self
                    .0
                    .invoke_slot(#index, __args)
                    .and_then(|value| {
                        <#ret as ::eventbridge::FromValue>::from_value(value)
                            .map_err(::eventbridge::InvocationError::from)
                    });
                match __result {
                    ::core::result::Result::Ok(value) => value,
                    ::core::result::Result::Err(err) => ::std::panic::panic_any(err),
                }
            }
        }
    });

    Ok(quote! {
        #item

        #[doc = concat!("Event adapter implementing [`", stringify!(#trait_name), "`].")]
        #[doc = ""]
        #[doc = "Every trait method emits the event of the same name. A failing sync"]
        #[doc = "listener panics with the `InvocationError` as payload."]
        #[derive(Clone, Debug)]
        #vis struct #adapter(::eventbridge::EventAdapter);

        impl #adapter {
            /// Interface description of the trait.
            pub fn descriptor() -> &'static ::eventbridge::InterfaceDescriptor {
                static DESCRIPTOR: ::std::sync::LazyLock<::eventbridge::InterfaceDescriptor> =
                    ::std::sync::LazyLock::new(|| {
                        ::eventbridge::InterfaceDescriptor::interface(#interface)
                            #(#methods)*
                    });
                &DESCRIPTOR
            }

            /// Adapt the trait on `engine`.
            pub fn new(
                engine: ::std::sync::Arc<dyn ::eventbridge::Engine>,
            ) -> ::core::result::Result<Self, ::eventbridge::AdapterError> {
                ::eventbridge::EventAdapter::new(engine, Self::descriptor()).map(Self)
            }

            /// The untyped adapter.
            pub fn into_inner(self) -> ::eventbridge::EventAdapter {
                self.0
            }
        }

        impl ::core::ops::Deref for #adapter {
            type Target = ::eventbridge::EventAdapter;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl #trait_name for #adapter {
            #(#impls)*
        }
    })
}

/// Implementation of the `#[event_interface]` attribute macro.
pub fn event_interface_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as InterfaceArgs);
    let item = parse_macro_input!(item as ItemTrait);

    match expand(args, item) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_wrapped_primitives_use_boxed_names() {
        assert_eq!(reference_name(&parse_quote!(Option<i32>)), "java.lang.Integer");
        assert_eq!(reference_name(&parse_quote!(Option<bool>)), "java.lang.Boolean");
        assert_eq!(reference_name(&parse_quote!(Option<char>)), "java.lang.Character");
        assert_eq!(reference_name(&parse_quote!(Option<f64>)), "java.lang.Double");
        assert_eq!(reference_name(&parse_quote!(Option<String>)), "java.lang.String");
        assert_eq!(reference_name(&parse_quote!(&str)), "java.lang.String");
    }

    #[test]
    fn test_unconvertible_params_are_rejected() {
        assert!(check_param(&parse_quote!(&i32)).is_err());
        assert!(check_param(&parse_quote!(&String)).is_err());
        assert!(check_param(&parse_quote!(Option<&i32>)).is_err());
        assert!(check_param(&parse_quote!(Option<usize>)).is_err());

        assert!(check_param(&parse_quote!(&str)).is_ok());
        assert!(check_param(&parse_quote!(Option<&str>)).is_ok());
        assert!(check_param(&parse_quote!(Option<i64>)).is_ok());
        assert!(check_param(&parse_quote!(String)).is_ok());
    }
}
