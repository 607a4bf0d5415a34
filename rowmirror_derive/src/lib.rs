use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Data, DeriveInput, Fields, Ident, LitStr, Path, Type, parse_macro_input, spanned::Spanned,
};

/// Derives `rowmirror::Mappable` (and `FieldKind`, so the struct can be
/// nested in other models).
///
/// Struct options: `#[mirror(version = "B1")]`, `#[mirror(public)]`,
/// `#[mirror(declare_with = "path::to_fn")]`.
/// Field options: `#[mirror(primary)]`, `#[mirror(unique)]`,
/// `#[mirror(exclude)]`, `#[mirror(base)]`.
#[proc_macro_derive(Mappable, attributes(mirror))]
pub fn derive_mappable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_mappable(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct ModelOptions {
    version: Option<String>,
    public: bool,
    declare_with: Option<Path>,
}

#[derive(Default)]
struct FieldOptions {
    primary: bool,
    unique: bool,
    exclude: bool,
    base: bool,
}

struct ModelField {
    ident: Ident,
    name: String,
    ty: Type,
    options: FieldOptions,
}

fn expand_mappable(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Mappable does not support generic structs",
        ));
    }

    let options = parse_model_options(&input.attrs)?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Mappable can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Mappable requires named fields",
            ));
        }
    };

    let mut fields = Vec::<ModelField>::new();
    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Mappable requires named fields"))?;
        let options = parse_field_options(&field.attrs)?;
        fields.push(ModelField {
            name: ident.unraw().to_string(),
            ident,
            ty: field.ty,
            options,
        });
    }

    if fields.is_empty() {
        return Err(syn::Error::new(
            struct_name.span(),
            "Mappable requires at least one field",
        ));
    }

    if fields.len() > u16::MAX as usize {
        return Err(syn::Error::new(
            struct_name.span(),
            "Mappable supports at most 65535 fields",
        ));
    }

    let type_name = struct_name.to_string();

    let version_fn = options.version.as_ref().map(|version| {
        quote! {
            fn database_version() -> &'static str {
                #version
            }
        }
    });
    let public_fn = options.public.then(|| {
        quote! {
            fn is_public_database() -> bool {
                true
            }
        }
    });

    let descriptors = fields.iter().enumerate().map(|(index, field)| {
        let ident = &field.ident;
        let name = &field.name;
        let index = index as u16;
        let constructor = if field.options.base {
            quote! { embedded }
        } else {
            quote! { of }
        };
        quote! {
            ::rowmirror::mapping::TypeDescriptor::#constructor(
                #name,
                ::rowmirror::mapping::FieldId::new(#type_name, #index),
                &self.#ident,
            )
        }
    });

    let mut declarations = Vec::new();
    for field in fields.iter().filter(|f| f.options.base) {
        let ident = &field.ident;
        declarations.push(quote! {
            ::rowmirror::mapping::Mappable::declare_keys(&self.#ident, keys);
        });
    }
    for field in fields.iter().filter(|f| !f.options.base) {
        let name = &field.name;
        if field.options.primary {
            declarations.push(quote! { keys.primary(#name); });
        }
        if field.options.unique {
            declarations.push(quote! { keys.unique(#name); });
        }
        if field.options.exclude {
            declarations.push(quote! { keys.exclude(#name); });
        }
    }
    if let Some(path) = &options.declare_with {
        declarations.push(quote! { #path(self, keys); });
    }
    let declare_fn = (!declarations.is_empty()).then(|| {
        quote! {
            fn declare_keys(&self, keys: &mut ::rowmirror::mapping::KeyRegistry) {
                #(#declarations)*
            }
        }
    });

    let writes = fields.iter().map(|field| {
        let ident = &field.ident;
        let name = &field.name;
        if field.options.base {
            quote! {
                map.extend(::rowmirror::mapping::Mappable::to_value_map(&self.#ident));
            }
        } else {
            quote! {
                ::rowmirror::mapping::write_field(&mut map, #name, &self.#ident);
            }
        }
    });

    let reads = fields.iter().map(|field| {
        let ident = &field.ident;
        let ty = &field.ty;
        let name = &field.name;
        if field.options.base {
            quote! {
                value.#ident = <#ty as ::rowmirror::mapping::Mappable>::from_value_map(map);
            }
        } else {
            quote! {
                ::rowmirror::mapping::read_field(&mut value.#ident, map, #type_name, #name);
            }
        }
    });

    Ok(quote! {
        impl ::rowmirror::mapping::Mappable for #struct_name {
            fn type_name() -> &'static str {
                #type_name
            }

            #version_fn
            #public_fn

            fn describe(&self) -> ::std::vec::Vec<::rowmirror::mapping::TypeDescriptor> {
                ::std::vec![#(#descriptors),*]
            }

            #declare_fn

            fn to_value_map(
                &self,
            ) -> ::std::collections::BTreeMap<::std::string::String, ::rowmirror::core::Value> {
                let mut map = ::std::collections::BTreeMap::new();
                #(#writes)*
                map
            }

            fn from_value_map(
                map: &::std::collections::BTreeMap<::std::string::String, ::rowmirror::core::Value>,
            ) -> Self {
                let mut value = <Self as ::std::default::Default>::default();
                #(#reads)*
                value
            }
        }

        impl ::rowmirror::mapping::FieldKind for #struct_name {
            fn type_tag() -> ::rowmirror::core::TypeTag {
                ::rowmirror::core::TypeTag::Composite(#type_name)
            }

            fn to_value(&self) -> ::rowmirror::mapping::FieldValue {
                ::rowmirror::mapping::FieldValue::Present(::rowmirror::core::Value::Map(
                    ::rowmirror::mapping::Mappable::to_value_map(self),
                ))
            }

            fn from_value(value: &::rowmirror::core::Value) -> ::rowmirror::core::Result<Self> {
                ::rowmirror::mapping::composite_from_value::<Self>(value)
            }

            fn describe_nested(
                &self,
            ) -> ::std::option::Option<::std::vec::Vec<::rowmirror::mapping::TypeDescriptor>> {
                ::std::option::Option::Some(::rowmirror::mapping::Mappable::describe(self))
            }

            fn blank_nested()
                -> ::std::option::Option<::std::vec::Vec<::rowmirror::mapping::TypeDescriptor>>
            {
                ::std::option::Option::Some(::rowmirror::mapping::blank_descriptors::<Self>())
            }
        }
    })
}

fn parse_model_options(attrs: &[syn::Attribute]) -> syn::Result<ModelOptions> {
    let mut options = ModelOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("mirror") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("version") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                let version = lit.value();
                if version.is_empty() || !version.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(syn::Error::new(
                        lit.span(),
                        "version must be a non-empty alphanumeric tag, e.g. \"A1\"",
                    ));
                }
                options.version = Some(version);
                return Ok(());
            }

            if meta.path.is_ident("public") {
                options.public = true;
                return Ok(());
            }

            if meta.path.is_ident("declare_with") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.declare_with = Some(lit.parse()?);
                return Ok(());
            }

            Err(meta.error(
                "Unsupported mirror attribute. Supported: version = \"...\", public, declare_with = \"...\"",
            ))
        })?;
    }

    Ok(options)
}

fn parse_field_options(attrs: &[syn::Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("mirror") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary") {
                options.primary = true;
                return Ok(());
            }

            if meta.path.is_ident("unique") {
                options.unique = true;
                return Ok(());
            }

            if meta.path.is_ident("exclude") {
                options.exclude = true;
                return Ok(());
            }

            if meta.path.is_ident("base") {
                options.base = true;
                return Ok(());
            }

            Err(meta.error(
                "Unsupported #[mirror(...)] field option. Supported: primary, unique, exclude, base",
            ))
        })?;

        if options.base && (options.primary || options.unique || options.exclude) {
            return Err(syn::Error::new(
                attr.span(),
                "#[mirror(base)] cannot be combined with primary, unique or exclude",
            ));
        }

        if options.exclude && (options.primary || options.unique) {
            return Err(syn::Error::new(
                attr.span(),
                "#[mirror(exclude)] cannot be combined with primary or unique",
            ));
        }
    }

    Ok(options)
}
