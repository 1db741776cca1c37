//! Procedural macros for `sigbind`.
//!
//! - `#[endpoint(...)]` turns a free function into a `Callable` unit struct
//!   named `<CamelCaseName>Endpoint`
//! - `#[derive(Construct)]` makes a struct usable as a nested parameter type
//!
//! Parameter defaults are declared with `#[param(default = <expr>)]`, where the
//! expression is anything convertible into `serde_json::Value`.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, FnArg, GenericArgument, Ident,
    ItemFn, LitBool, LitStr, Pat, PathArguments, PathSegment, ReturnType, Type,
};

#[derive(Default)]
struct EndpointArgs {
    name: Option<LitStr>,
    methods: Vec<Ident>,
    allow_get_params: Option<bool>,
    auth_required: bool,
    args_schema: Option<Expr>,
    schema: Option<Expr>,
}

/// Code generated for one parameter.
struct ParamPlan {
    name: String,
    tag: TokenStream2,
    extract: TokenStream2,
    default: Option<TokenStream2>,
}

impl ParamPlan {
    fn spec(&self) -> TokenStream2 {
        let name = &self.name;
        let tag = &self.tag;
        match &self.default {
            Some(default) => quote! {
                ::sigbind::schema::ParameterSpec::optional(#name, #tag, #default)
            },
            None => quote! {
                ::sigbind::schema::ParameterSpec::required(#name, #tag)
            },
        }
    }
}

fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(p) if p.qself.is_none() => p.path.segments.last(),
        _ => None,
    }
}

fn first_type_arg(segment: &PathSegment) -> Option<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|a| match a {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

fn is_ident(ty: &Type, name: &str) -> bool {
    last_segment(ty).is_some_and(|s| s.ident == name)
}

/// `TypeTag` for types that cast without a nested schema.
fn scalar_tag(ty: &Type) -> Option<TokenStream2> {
    let segment = last_segment(ty)?;
    let variant = match segment.ident.to_string().as_str() {
        // Narrower widths carry their own range so out-of-range input fails validation.
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            let width = &segment.ident;
            return Some(quote! {
                ::sigbind::caster::TypeTag::int_range(#width::MIN as i128, #width::MAX as i128)
            });
        }
        "f32" | "f64" => "Float",
        "bool" => "Bool",
        "String" => "Text",
        "Vec" if first_type_arg(segment).is_some_and(|t| is_ident(t, "u8")) => "Bytes",
        "Vec" => "Sequence",
        "HashSet" | "BTreeSet" => "Set",
        "HashMap" | "BTreeMap" | "Map" => "Mapping",
        "Value" => "Any",
        _ => return None,
    };
    let variant = Ident::new(variant, Span::call_site());
    Some(quote! { ::sigbind::caster::TypeTag::#variant })
}

/// Strip `Box<T>` to `T`, reporting whether it was boxed.
fn unbox(ty: &Type) -> (&Type, bool) {
    match last_segment(ty) {
        Some(s) if s.ident == "Box" => match first_type_arg(s) {
            Some(inner) => (inner, true),
            None => (ty, false),
        },
        _ => (ty, false),
    }
}

fn nested_tag(ty: &Type) -> TokenStream2 {
    quote! { ::sigbind::caster::TypeTag::nested::<#ty>() }
}

fn plan_param(name: String, ty: &Type, default: Option<Expr>) -> syn::Result<ParamPlan> {
    if let Type::Reference(r) = ty {
        return Err(syn::Error::new(r.span(), "endpoint parameters must be owned types"));
    }
    let default = default.map(|expr| quote! { #expr });
    let null = quote! { ::sigbind::serde_json::Value::Null };

    if name == "request" {
        return Ok(ParamPlan {
            extract: quote! { args.take::<#ty>(#name)? },
            tag: quote! { ::sigbind::caster::TypeTag::Any },
            name,
            default,
        });
    }

    if let Some(option) = last_segment(ty).filter(|s| s.ident == "Option") {
        let inner = first_type_arg(option)
            .ok_or_else(|| syn::Error::new(option.span(), "Option needs a type argument"))?;
        let default = Some(default.unwrap_or(null));
        if let Some(tag) = scalar_tag(inner) {
            return Ok(ParamPlan {
                extract: quote! { args.take::<#ty>(#name)? },
                tag,
                name,
                default,
            });
        }
        let (target, boxed) = unbox(inner);
        let wrap = if boxed {
            quote! { .map(::std::boxed::Box::new) }
        } else {
            quote! {}
        };
        return Ok(ParamPlan {
            extract: quote! { args.take_optional_instance::<#target>(#name)? #wrap },
            tag: nested_tag(target),
            name,
            default,
        });
    }

    if let Some(tag) = scalar_tag(ty) {
        return Ok(ParamPlan {
            extract: quote! { args.take::<#ty>(#name)? },
            tag,
            name,
            default,
        });
    }

    let (target, boxed) = unbox(ty);
    let extract = if boxed {
        quote! { ::std::boxed::Box::new(args.take_instance::<#target>(#name)?) }
    } else {
        quote! { args.take_instance::<#target>(#name)? }
    };
    Ok(ParamPlan {
        extract,
        tag: nested_tag(target),
        name,
        default,
    })
}

/// Pull `#[param(default = ...)]` out of `attrs`.
fn take_param_attr(attrs: &mut Vec<Attribute>) -> syn::Result<Option<Expr>> {
    let mut default = None;
    let mut error = None;
    attrs.retain(|attr| {
        if !attr.path().is_ident("param") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                default = Some(meta.value()?.parse::<Expr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported param option, expected `default = <expr>`"))
            }
        });
        if let Err(e) = parsed {
            error = Some(e);
        }
        false
    });
    match error {
        Some(e) => Err(e),
        None => Ok(default),
    }
}

fn read_param_attr(attrs: &[Attribute]) -> syn::Result<Option<Expr>> {
    let mut attrs = attrs.to_vec();
    take_param_attr(&mut attrs)
}

fn unraw(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}

fn camel_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Expose a function as an endpoint.
///
/// ```ignore
/// #[endpoint(name = "add", methods(GET, POST), allow_get_params = false, auth_required)]
/// fn add(a: i64, #[param(default = 10)] b: i64) -> Result<Sum, ApiError> { ... }
///
/// let endpoint = AddEndpoint::endpoint(&registry)?;
/// ```
///
/// Options:
/// - `name = "..."` - URL segment and schema name (defaults to the function name)
/// - `methods(GET, POST, ...)` - allowed methods (defaults to any)
/// - `allow_get_params = <bool>` - read the query on non-GET requests (defaults to true)
/// - `auth_required` - reject unauthenticated requests
/// - `args_schema = <expr>` / `schema = <expr>` - explicit input / output fields
///
/// A parameter named `request` receives the live `Arc<ApiRequest>` and is not
/// validated. `Option<T>` parameters default to `null`.
#[proc_macro_attribute]
pub fn endpoint(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = EndpointArgs::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            args.name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("methods") {
            meta.parse_nested_meta(|m| {
                let ident = m.path.get_ident().ok_or_else(|| m.error("expected an HTTP method"))?;
                args.methods.push(Ident::new(&ident.to_string().to_uppercase(), ident.span()));
                Ok(())
            })?;
        } else if meta.path.is_ident("allow_get_params") {
            let lit: LitBool = meta.value()?.parse()?;
            args.allow_get_params = Some(lit.value);
        } else if meta.path.is_ident("auth_required") {
            args.auth_required = if meta.input.peek(syn::Token![=]) {
                meta.value()?.parse::<LitBool>()?.value
            } else {
                true
            };
        } else if meta.path.is_ident("args_schema") {
            args.args_schema = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("schema") {
            args.schema = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("unsupported endpoint option"));
        }
        Ok(())
    });
    parse_macro_input!(attr with parser);
    let func = parse_macro_input!(item as ItemFn);
    expand_endpoint(args, func)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_endpoint(args: EndpointArgs, mut func: ItemFn) -> syn::Result<TokenStream2> {
    let sig = &func.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(asyncness.span(), "endpoints must be synchronous functions"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(sig.generics.span(), "endpoints cannot be generic"));
    }

    let fn_ident = func.sig.ident.clone();
    let vis = func.vis.clone();
    let name = args
        .name
        .as_ref()
        .map_or_else(|| unraw(&fn_ident), LitStr::value);
    let struct_ident = format_ident!("{}Endpoint", camel_case(&unraw(&fn_ident)));

    let mut plans = Vec::new();
    let mut call_args = Vec::new();
    for input in &mut func.sig.inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(syn::Error::new(input.span(), "endpoints cannot take `self`"));
        };
        let default = take_param_attr(&mut pat_type.attrs)?;
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return Err(syn::Error::new(pat_type.pat.span(), "endpoint parameters must be plain identifiers"));
        };
        let ident = pat_ident.ident.clone();
        let plan = plan_param(unraw(&ident), &pat_type.ty, default)?;
        let extract = &plan.extract;
        call_args.push(quote! { #extract });
        plans.push(plan);
    }

    let returns_result = match &func.sig.output {
        ReturnType::Type(_, ty) => is_ident(ty, "Result"),
        ReturnType::Default => false,
    };
    let invoke = quote! { #fn_ident(#(#call_args),*) };
    let reply = if returns_result {
        quote! { ::sigbind::typed::reply(#invoke) }
    } else {
        quote! { ::sigbind::typed::reply::<_, ::sigbind::typed::CallError>(Ok(#invoke)) }
    };

    let specs = plans.iter().map(ParamPlan::spec);
    let methods = if args.methods.is_empty() {
        quote! {}
    } else {
        let methods = &args.methods;
        quote! { .methods([#(::sigbind::http::Method::#methods),*]) }
    };
    let allow_get_params = args.allow_get_params.unwrap_or(true);
    let auth_required = args.auth_required;
    let args_schema = args
        .args_schema
        .as_ref()
        .map(|e| quote! { .args_schema(#e) })
        .unwrap_or_default();
    let schema = args
        .schema
        .as_ref()
        .map(|e| quote! { .schema(#e) })
        .unwrap_or_default();

    Ok(quote! {
        #func

        #[doc = concat!("Endpoint wrapper generated for [`", stringify!(#fn_ident), "`].")]
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #struct_ident;

        impl #struct_ident {
            /// Registration options declared on the function.
            #[must_use]
            pub fn options() -> ::sigbind::dispatcher::EndpointOptions {
                ::sigbind::dispatcher::EndpointOptions::new()
                    .name(#name)
                    #methods
                    .allow_get_params(#allow_get_params)
                    .auth_required(#auth_required)
                    #args_schema
                    #schema
            }

            /// Bind to `registry` with the declared options.
            pub fn endpoint(
                registry: &::sigbind::schema::SchemaRegistry,
            ) -> ::std::result::Result<::sigbind::dispatcher::Endpoint, ::sigbind::schema::SchemaError> {
                ::sigbind::dispatcher::Endpoint::new(
                    ::std::sync::Arc::new(#struct_ident),
                    Self::options(),
                    registry,
                )
            }
        }

        impl ::sigbind::typed::Callable for #struct_ident {
            fn name(&self) -> &str {
                #name
            }

            fn parameters(&self) -> ::std::vec::Vec<::sigbind::schema::ParameterSpec> {
                ::std::vec![#(#specs),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn call(
                &self,
                mut args: ::sigbind::typed::Arguments,
            ) -> ::std::result::Result<::sigbind::typed::Typed, ::sigbind::typed::CallError> {
                #reply
            }
        }
    })
}

/// Make a struct with named fields usable as a nested parameter type.
///
/// Field types follow the same rules as `#[endpoint]` parameters, and
/// `#[param(default = ...)]` works on fields.
#[proc_macro_derive(Construct, attributes(param))]
pub fn derive_construct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_construct(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_construct(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(input.generics.span(), "Construct cannot be derived for generic types"));
    }
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => return Err(syn::Error::new(ident.span(), "Construct needs named fields")),
        },
        _ => return Err(syn::Error::new(ident.span(), "Construct can only be derived for structs")),
    };

    let mut specs = Vec::new();
    let mut inits = Vec::new();
    for field in fields {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let default = read_param_attr(&field.attrs)?;
        let plan = plan_param(unraw(field_ident), &field.ty, default)?;
        specs.push(plan.spec());
        let extract = &plan.extract;
        inits.push(quote! { #field_ident: #extract });
    }
    let name = ident.to_string();

    Ok(quote! {
        impl ::sigbind::typed::Construct for #ident {
            const NAME: &'static str = #name;

            fn parameters() -> ::std::vec::Vec<::sigbind::schema::ParameterSpec> {
                ::std::vec![#(#specs),*]
            }

            fn construct(
                args: &mut ::sigbind::typed::Arguments,
            ) -> ::std::result::Result<Self, ::sigbind::typed::CallError> {
                ::std::result::Result::Ok(Self { #(#inits),* })
            }
        }
    })
}
