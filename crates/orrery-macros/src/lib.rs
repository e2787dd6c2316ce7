use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, Result, Type, parse_macro_input};

/// Derive macro for scenario configuration sections.
///
/// Generates a `Default` implementation from per-field `#[default(...)]`
/// attributes and a `validate_ranges(&self) -> Result<(), String>` method
/// from optional `#[range(...)]` attributes. A range is any expression
/// implementing `RangeBounds` for the field type, so `-16.0..=0.0`,
/// `1..` and `0.0..1.0` are all accepted.
///
/// String fields receive their default through `Into::into`, so a plain
/// string literal is enough.
///
/// # Example
/// ```
/// use orrery_macros::ConfigDefaults;
///
/// #[derive(ConfigDefaults)]
/// pub struct IntegratorSection {
///     #[default("rkf78")]
///     pub name: String,
///
///     #[default(-10.0)]
///     #[range(-16.0..=0.0)]
///     pub accuracy: f64,
///
///     #[default(20)]
///     #[range(1..)]
///     pub max_iterations: usize,
/// }
///
/// let section = IntegratorSection::default();
/// assert_eq!(section.name, "rkf78");
/// assert!(section.validate_ranges().is_ok());
///
/// let out_of_range = IntegratorSection { accuracy: 3.0, ..section };
/// assert!(out_of_range.validate_ranges().is_err());
/// ```
///
/// # Errors
///
/// Compilation fails when the derive is applied to anything but a struct
/// with named fields, when a field lacks `#[default(...)]`, or when either
/// attribute is empty.
#[proc_macro_derive(ConfigDefaults, attributes(default, range))]
pub fn config_defaults(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unnamed(_) => {
                return Err(Error::new_spanned(
                    &input,
                    "ConfigDefaults only supports structs with named fields",
                ));
            }
            Fields::Unit => {
                return Err(Error::new_spanned(
                    &input,
                    "ConfigDefaults cannot be derived for unit structs",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                &input,
                "ConfigDefaults can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                &input,
                "ConfigDefaults can only be derived for structs, not unions",
            ));
        }
    };

    let mut defaults = Vec::with_capacity(fields.len());
    let mut checks = Vec::new();

    for field in fields {
        let ident = field_ident(field)?;

        let default_value = attribute_tokens(field, ident, "default")?.ok_or_else(|| {
            Error::new_spanned(
                field,
                format!("Field '{ident}' must have a #[default(...)] attribute specifying its default value"),
            )
        })?;

        defaults.push(if is_string_type(&field.ty) {
            quote! { #ident: ::std::convert::Into::into(#default_value) }
        } else {
            quote! { #ident: #default_value }
        });

        if let Some(range) = attribute_tokens(field, ident, "range")? {
            let label = ident.to_string();
            let range_text = range.to_string();
            checks.push(quote! {
                if !::std::ops::RangeBounds::contains(&(#range), &self.#ident) {
                    return ::std::result::Result::Err(::std::format!(
                        "{} = {:?} is outside of the allowed range {}",
                        #label,
                        self.#ident,
                        #range_text,
                    ));
                }
            });
        }
    }

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics Default for #name #ty_generics #where_clause {
            fn default() -> Self {
                Self {
                    #(#defaults),*
                }
            }
        }

        #[automatically_derived]
        impl #impl_generics #name #ty_generics #where_clause {
            /// Checks every field annotated with `#[range(...)]`.
            pub fn validate_ranges(&self) -> ::std::result::Result<(), ::std::string::String> {
                #(#checks)*
                ::std::result::Result::Ok(())
            }
        }
    })
}

fn field_ident(field: &Field) -> Result<&Ident> {
    field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new_spanned(field, "ConfigDefaults requires named fields"))
}

fn is_string_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "String";
        }
    }
    false
}

/// Returns the tokens inside `#[<attribute>(...)]`, if the field carries it.
fn attribute_tokens(
    field: &Field,
    ident: &Ident,
    attribute: &str,
) -> Result<Option<proc_macro2::TokenStream>> {
    let Some(attr) = field.attrs.iter().find(|attr| attr.path().is_ident(attribute)) else {
        return Ok(None);
    };

    let tokens: proc_macro2::TokenStream = attr.parse_args().map_err(|e| {
        Error::new_spanned(
            attr,
            format!("Failed to parse {attribute} attribute for field '{ident}': {e}"),
        )
    })?;

    if tokens.is_empty() {
        return Err(Error::new_spanned(
            attr,
            format!("Field '{ident}' has an empty #[{attribute}()] attribute"),
        ));
    }

    Ok(Some(tokens))
}
