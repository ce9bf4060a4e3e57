use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments,
    Type,
};

/// Derives `FromInvocation` for a struct with named fields.
///
/// # Usage
///
/// ```ignore
/// #[derive(FromInvocation)]
/// struct GiveArgs {
///     player: String,
///     #[arbor(name = "amount")]
///     count: i64,
///     #[arbor(default)]
///     silent: bool,
///     note: Option<String>,
/// }
/// ```
///
/// Each field is looked up by its own name unless `#[arbor(name = "...")]`
/// says otherwise:
///
/// - `Option<T>` fields are `None` when the value is absent
/// - `#[arbor(default)]` fields fall back to `Default::default()`
/// - any other field is required; a missing value or one of another type
///   yields a user error
///
/// This will generate:
///
/// ```ignore
/// impl ::arbor::FromInvocation for GiveArgs {
///     fn from_values(values: &::arbor::ArgumentValues) -> Result<Self, ::arbor::HandlerError> {
///         Ok(Self {
///             player: values.require::<String>("player")?.clone(),
///             count: values.require::<i64>("amount")?.clone(),
///             silent: values.get::<bool>("silent").cloned().unwrap_or_default(),
///             note: values.get::<String>("note").cloned(),
///         })
///     }
/// }
/// ```
#[proc_macro_derive(FromInvocation, attributes(arbor))]
pub fn derive_from_invocation(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    struct_name,
                    "FromInvocation requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "FromInvocation can only be derived for structs",
            ))
        }
    };

    let initializers = fields
        .iter()
        .map(field_initializer)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::arbor::FromInvocation for #struct_name #ty_generics #where_clause {
            fn from_values(
                values: &::arbor::ArgumentValues,
            ) -> ::core::result::Result<Self, ::arbor::HandlerError> {
                ::core::result::Result::Ok(Self {
                    #(#initializers,)*
                })
            }
        }
    })
}

fn field_initializer(field: &Field) -> syn::Result<proc_macro2::TokenStream> {
    let Some(ident) = &field.ident else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };
    let options = FieldOptions::from_field(field)?;
    let name = options.name.unwrap_or_else(|| ident.to_string());
    let ty = &field.ty;

    let value = if let Some(inner) = option_inner(ty) {
        quote! { values.get::<#inner>(#name).cloned() }
    } else if options.default {
        quote! { values.get::<#ty>(#name).cloned().unwrap_or_default() }
    } else {
        quote! { values.require::<#ty>(#name)?.clone() }
    };

    Ok(quote! { #ident: #value })
}

/// Options from `#[arbor(...)]` on a field.
#[derive(Default)]
struct FieldOptions {
    name: Option<String>,
    default: bool,
}

impl FieldOptions {
    fn from_field(field: &Field) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("arbor")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    options.name = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("default") {
                    options.default = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported arbor attribute, expected `name` or `default`"))
                }
            })?;
        }
        Ok(options)
    }
}

/// `T` when `ty` is written as `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
