/*
 * Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Generics, Ident, Type};

/// Container-level attributes for `#[settings(...)]`
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(settings), supports(struct_named))]
pub struct SettingsOpts {
    ident: Ident,
    generics: Generics,
    data: darling::ast::Data<darling::util::Ignored, FieldOpts>,

    /// Environment variable prefix (e.g., "APP_"). Only needed on the root.
    #[darling(default)]
    prefix: Option<String>,

    /// Metadata name for the figment Provider (e.g., "app-settings").
    #[darling(default)]
    name: Option<String>,
}

/// Field-level attributes for `#[settings(...)]`
#[derive(Debug, FromField)]
#[darling(attributes(settings))]
struct FieldOpts {
    ident: Option<Ident>,
    ty: Type,

    /// Explicit stored key segment (overrides the field name)
    #[darling(default)]
    key: Option<String>,

    /// Skip this field entirely
    #[darling(default)]
    skip: bool,

    /// Mark as secret (masked in logs)
    #[darling(default)]
    secret: bool,

    /// Treat this field as a leaf value (not a nested branch)
    #[darling(default)]
    leaf: bool,

    /// Stored-form default value, parsed through the field's type mapper
    #[darling(default)]
    default: Option<String>,

    /// Loading fails when neither store nor environment supplies a value
    #[darling(default)]
    mandatory: bool,

    /// Name of a registered type mapper to bind through
    #[darling(default)]
    mapper: Option<String>,
}

/// How a field binds to the flat key space.
enum FieldKind {
    Leaf,
    Branch(Type),
    List(Children),
    Map(Children),
}

enum Children {
    Leaf,
    Branch(Type),
}

/// Container shape detected around a field's element type.
enum ContainerShape {
    None,
    Vec,
    Map,
}

pub fn generate_impl(input: &DeriveInput) -> TokenStream2 {
    match SettingsOpts::from_derive_input(input) {
        Ok(opts) => generate_from_opts(opts),
        Err(e) => e.write_errors(),
    }
}

fn generate_from_opts(opts: SettingsOpts) -> TokenStream2 {
    let struct_name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let fields = match opts.data {
        darling::ast::Data::Struct(fields) => fields.fields,
        darling::ast::Data::Enum(_) => unreachable!("rejected by darling supports"),
    };

    let prefix = opts.prefix.as_deref().unwrap_or("");

    // Metadata name: use provided or derive from the type name
    // (e.g., "AppSettings" -> "app-settings").
    let provider_name = opts.name.unwrap_or_else(|| {
        let type_name = struct_name.to_string();
        let mut result = String::new();
        for (i, c) in type_name.chars().enumerate() {
            if c.is_uppercase() && i > 0 {
                result.push('-');
            }
            result.push(c.to_ascii_lowercase());
        }
        result
    });

    let mut errors = darling::Error::accumulator();
    let mut entries: Vec<TokenStream2> = Vec::new();

    for field in &fields {
        if field.skip {
            continue;
        }

        let field_ident = match &field.ident {
            Some(ident) => ident,
            None => continue,
        };

        let field_name = field_ident.to_string();
        let key_segment = field.key.clone().unwrap_or_else(|| field_name.clone());

        let kind = classify_field(field);

        if let Err(e) = validate_attributes(field, &kind) {
            errors.push(e.with_span(field_ident));
            continue;
        }

        let kind_tokens = kind_tokens(&kind);
        let secret = field.secret;
        let mandatory = field.mandatory;
        let default_tokens = option_str_tokens(field.default.as_deref());
        let mapper_tokens = option_str_tokens(field.mapper.as_deref());

        entries.push(quote! {
            settings::PropertyInfo {
                name: #key_segment,
                field: #field_name,
                kind: #kind_tokens,
                secret: #secret,
                mandatory: #mandatory,
                default: #default_tokens,
                mapper: #mapper_tokens,
            }
        });
    }

    if let Err(e) = errors.finish() {
        return e.write_errors();
    }

    let count = entries.len();

    quote! {
        impl #impl_generics settings::SettingsSchema for #struct_name #ty_generics #where_clause {
            fn properties() -> &'static [settings::PropertyInfo] {
                static PROPERTIES: [settings::PropertyInfo; #count] = [
                    #(#entries),*
                ];
                &PROPERTIES
            }

            fn env_prefix() -> &'static str {
                #prefix
            }

            fn provider_name() -> &'static str {
                #provider_name
            }
        }
    }
}

/// Classify a field as leaf, branch, list or map, unwrapping transparent
/// wrappers first. This is where the declared type decides which descriptor
/// the schema gets.
fn classify_field(field: &FieldOpts) -> FieldKind {
    let (element_type, shape) = extract_type_info(&field.ty);
    let element_is_leaf = field.leaf || is_primitive_type(&element_type);

    match shape {
        ContainerShape::Vec => {
            if element_is_leaf {
                FieldKind::List(Children::Leaf)
            } else {
                FieldKind::List(Children::Branch(element_type))
            }
        }
        ContainerShape::Map => {
            if element_is_leaf {
                FieldKind::Map(Children::Leaf)
            } else {
                FieldKind::Map(Children::Branch(element_type))
            }
        }
        ContainerShape::None => {
            if element_is_leaf {
                FieldKind::Leaf
            } else {
                FieldKind::Branch(element_type)
            }
        }
    }
}

fn validate_attributes(field: &FieldOpts, kind: &FieldKind) -> Result<(), darling::Error> {
    let is_leaf = matches!(kind, FieldKind::Leaf);
    let has_leaf_children = matches!(
        kind,
        FieldKind::Leaf | FieldKind::List(Children::Leaf) | FieldKind::Map(Children::Leaf)
    );

    if field.default.is_some() && !is_leaf {
        return Err(darling::Error::custom(
            "`default` is only supported on leaf properties",
        ));
    }
    if field.mandatory && !is_leaf {
        return Err(darling::Error::custom(
            "`mandatory` is only supported on leaf properties",
        ));
    }
    if field.mapper.is_some() && !has_leaf_children {
        return Err(darling::Error::custom(
            "`mapper` is only supported on leaf properties and containers of leaves",
        ));
    }
    Ok(())
}

fn kind_tokens(kind: &FieldKind) -> TokenStream2 {
    match kind {
        FieldKind::Leaf => quote! { settings::PropertyKind::Leaf },
        FieldKind::Branch(ty) => quote! {
            settings::PropertyKind::Branch(<#ty as settings::SettingsSchema>::properties)
        },
        FieldKind::List(Children::Leaf) => quote! {
            settings::PropertyKind::List(settings::Children::Leaf)
        },
        FieldKind::List(Children::Branch(ty)) => quote! {
            settings::PropertyKind::List(settings::Children::Branch(
                <#ty as settings::SettingsSchema>::properties,
            ))
        },
        FieldKind::Map(Children::Leaf) => quote! {
            settings::PropertyKind::Map(settings::Children::Leaf)
        },
        FieldKind::Map(Children::Branch(ty)) => quote! {
            settings::PropertyKind::Map(settings::Children::Branch(
                <#ty as settings::SettingsSchema>::properties,
            ))
        },
    }
}

fn option_str_tokens(value: Option<&str>) -> TokenStream2 {
    match value {
        Some(s) => quote! { Some(#s) },
        None => quote! { None },
    }
}

/// Check if a type is a Rust primitive that doesn't need nested expansion.
fn is_primitive_type(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    let Some(segment) = type_path.path.segments.last() else {
        return false;
    };

    let ident = segment.ident.to_string();

    if matches!(
        ident.as_str(),
        "bool"
            | "u8"
            | "u16"
            | "u32"
            | "u64"
            | "u128"
            | "i8"
            | "i16"
            | "i32"
            | "i64"
            | "i128"
            | "f32"
            | "f64"
            | "usize"
            | "isize"
            | "String"
            | "str"
    ) {
        return true;
    }

    // Option<T> - check inner type
    if ident == "Option"
        && let syn::PathArguments::AngleBracketed(args) = &segment.arguments
        && let Some(syn::GenericArgument::Type(inner)) = args.args.first()
    {
        return is_primitive_type(inner);
    }

    false
}

/// Extract the element type and container shape, unwrapping Arc/Box/Rc/Option.
/// `Vec<T>` yields a list shape, `HashMap<String, T>`/`BTreeMap<String, T>`
/// a map shape; everything else is a plain element.
fn extract_type_info(ty: &Type) -> (Type, ContainerShape) {
    let Type::Path(type_path) = ty else {
        return (ty.clone(), ContainerShape::None);
    };
    let Some(segment) = type_path.path.segments.last() else {
        return (ty.clone(), ContainerShape::None);
    };

    let ident = segment.ident.to_string();
    match ident.as_str() {
        "Vec" => {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments
                && let Some(syn::GenericArgument::Type(inner)) = args.args.first()
            {
                let (element, _) = extract_type_info(inner);
                return (element, ContainerShape::Vec);
            }
        }
        "HashMap" | "BTreeMap" => {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments
                && args.args.len() == 2
                && let Some(syn::GenericArgument::Type(value)) = args.args.iter().nth(1)
            {
                let (element, _) = extract_type_info(value);
                return (element, ContainerShape::Map);
            }
        }
        "Arc" | "Box" | "Rc" | "Option" => {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments
                && let Some(syn::GenericArgument::Type(inner)) = args.args.first()
            {
                return extract_type_info(inner);
            }
        }
        _ => {}
    }
    (ty.clone(), ContainerShape::None)
}
