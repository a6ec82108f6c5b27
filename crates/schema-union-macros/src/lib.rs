//! Proc macros for `schema-union`.
//!
//! Provides two macros:
//!
//! - **`#[variant]`**: attribute macro that implements `Schema` for a struct,
//!   marking it as one version of a union.
//!
//! - **`#[convert]`**: attribute macro that wraps a typed `fn(Old) -> New`
//!   into a byte-level `Converter` and a registration function.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, punctuated::Punctuated, token::Comma, ItemFn, ItemStruct, Meta};

/// Parsed `key = literal` arguments of an attribute.
#[derive(Default)]
struct Args {
    ints: Vec<(String, u32, Span)>,
    strs: Vec<(String, String)>,
}

impl Args {
    fn parse(args: &Punctuated<Meta, Comma>, allowed: &[&str]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for meta in args {
            let Meta::NameValue(nv) = meta else {
                return Err(syn::Error::new_spanned(meta, "expected `key = value`"));
            };
            let key = nv
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            if !allowed.contains(&key.as_str()) {
                return Err(syn::Error::new_spanned(
                    &nv.path,
                    format!("unknown attribute `{key}`"),
                ));
            }
            match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(lit),
                    ..
                }) => parsed.ints.push((key, lit.base10_parse()?, lit.span())),
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(lit),
                    ..
                }) => parsed.strs.push((key, lit.value())),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected an integer or string literal",
                    ))
                }
            }
        }
        Ok(parsed)
    }

    fn version(&self, key: &str) -> syn::Result<u32> {
        let (_, value, span) = self
            .ints
            .iter()
            .find(|(k, _, _)| k == key)
            .ok_or_else(|| {
                syn::Error::new(
                    Span::call_site(),
                    format!("missing required attribute `{key}`"),
                )
            })?;
        if *value == 0 {
            return Err(syn::Error::new(*span, "schema versions start at 1"));
        }
        Ok(*value)
    }

    fn string(&self, key: &str) -> syn::Result<String> {
        self.strs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                syn::Error::new(
                    Span::call_site(),
                    format!("missing required attribute `{key}`"),
                )
            })
    }
}

/// Builds a `SchemaVersion` constant from an already checked non-zero literal.
fn version_const(n: u32) -> proc_macro2::TokenStream {
    quote! {
        match ::schema_union::SchemaVersion::new(#n) {
            ::core::option::Option::Some(v) => v,
            ::core::option::Option::None => panic!("schema versions start at 1"),
        }
    }
}

/// Attribute macro that marks a struct as one version of a union.
///
/// # Attributes
///
/// - `version = N`: **Required.** The schema version, starting at 1.
/// - `union = "name"`: **Required.** The union this variant belongs to.
///
/// # Generated Implementations
///
/// - `schema_union::Schema` with `VERSION` and `UNION`
///
/// # Example
///
/// ```ignore
/// use schema_union::variant;
/// use serde::{Serialize, Deserialize};
///
/// #[variant(version = 1, union = "sensor")]
/// #[derive(Debug, Serialize, Deserialize)]
/// struct SensorV1 {
///     device_id: String,
///     temperature: f64,
/// }
/// ```
#[proc_macro_attribute]
pub fn variant(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    let parsed = Args::parse(&args, &["version", "union"]).and_then(|args| {
        Ok((args.version("version")?, args.string("union")?))
    });
    let (version, union) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_compile_error().into(),
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let version = version_const(version);

    let expanded = quote! {
        #input

        impl #impl_generics ::schema_union::Schema for #name #ty_generics #where_clause {
            const VERSION: ::schema_union::SchemaVersion = #version;
            const UNION: &'static str = #union;
        }
    };

    expanded.into()
}

/// Attribute macro that turns a typed conversion function into a converter.
///
/// The function must take the old variant by value and return the new one.
/// Both types must implement `Serialize` and `DeserializeOwned`; payloads are
/// postcard-encoded bytes.
///
/// # Attributes
///
/// - `from = N`: **Required.** Source schema version.
/// - `to = M`: **Required.** Target schema version; must be `N + 1`.
///
/// The argument type must be the `Schema` variant at `from` and the return
/// type the variant at `to`; a mismatch fails to compile.
///
/// # Generated Code
///
/// - A unit struct `{FnName}Converter` implementing
///   `schema_union::Converter<Vec<u8>>`.
/// - `fn register_{fn_name}(&mut VersionRegistry<Vec<u8>>)`, which registers
///   the converter on the `from → to` edge after checking both variants share
///   a union.
///
/// # Example
///
/// ```ignore
/// use schema_union::convert;
///
/// #[convert(from = 1, to = 2)]
/// fn add_humidity(old: SensorV1) -> SensorV2 {
///     SensorV2 {
///         temperature: old.temperature,
///         humidity: None,
///     }
/// }
/// // Generates: AddHumidityConverter + impl Converter<Vec<u8>>
/// // Generates: fn register_add_humidity(registry) -> Result<(), RegistryError>
/// ```
#[proc_macro_attribute]
pub fn convert(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let args = parse_macro_input!(attr with Punctuated::<Meta, Comma>::parse_terminated);

    let parsed = Args::parse(&args, &["from", "to"])
        .and_then(|args| Ok((args.version("from")?, args.version("to")?)));
    let (from, to) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.to_compile_error().into(),
    };
    if from.checked_add(1) != Some(to) {
        return syn::Error::new(
            Span::call_site(),
            format!(
                "converters run between adjacent versions; expected `to = {}`",
                from.saturating_add(1)
            ),
        )
        .to_compile_error()
        .into();
    }

    let input_type = match (input.sig.inputs.len(), input.sig.inputs.first()) {
        (1, Some(syn::FnArg::Typed(pat_type))) => &pat_type.ty,
        _ => {
            return syn::Error::new_spanned(
                &input.sig,
                "converter function must take exactly one argument",
            )
            .to_compile_error()
            .into();
        }
    };
    let output_type = match &input.sig.output {
        syn::ReturnType::Type(_, ty) => ty,
        syn::ReturnType::Default => {
            return syn::Error::new_spanned(
                &input.sig,
                "converter function must have a return type",
            )
            .to_compile_error()
            .into();
        }
    };

    let fn_name = &input.sig.ident;
    let vis = &input.vis;

    // snake_case -> PascalCase + "Converter"
    let struct_name = {
        let pascal: String = fn_name
            .to_string()
            .split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        syn::Ident::new(&format!("{pascal}Converter"), fn_name.span())
    };
    let register_fn = syn::Ident::new(&format!("register_{fn_name}"), fn_name.span());
    let from_check = format!("`{fn_name}` takes a variant that is not v{from}");
    let to_check = format!("`{fn_name}` returns a variant that is not v{to}");
    let from_n = from;
    let to_n = to;
    let from = version_const(from);
    let to = version_const(to);

    let expanded = quote! {
        #input

        // The declared edge must match the variants the function converts.
        const _: () = {
            assert!(
                <#input_type as ::schema_union::Schema>::VERSION.get() == #from_n,
                #from_check
            );
            assert!(
                <#output_type as ::schema_union::Schema>::VERSION.get() == #to_n,
                #to_check
            );
        };

        /// Byte-level converter generated by `#[convert]`.
        #vis struct #struct_name;

        impl ::schema_union::Converter<::std::vec::Vec<u8>> for #struct_name {
            fn convert(
                &self,
                input: ::std::vec::Vec<u8>,
            ) -> ::core::result::Result<::std::vec::Vec<u8>, ::schema_union::ConversionError> {
                let old: #input_type = ::schema_union::typed::decode(&input)?;
                ::schema_union::typed::encode(&#fn_name(old))
            }
        }

        /// Register this converter on its edge.
        #vis fn #register_fn(
            registry: &mut ::schema_union::VersionRegistry<::std::vec::Vec<u8>>,
        ) -> ::core::result::Result<(), ::schema_union::RegistryError> {
            ::schema_union::typed::same_union::<#input_type, #output_type>()?;
            registry.register_converter(#from, #to, #struct_name)
        }
    };

    expanded.into()
}
