use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Expr, Fields, Ident, LitStr, Type, parse_macro_input, spanned::Spanned,
};

#[proc_macro_derive(Composite, attributes(composite))]
pub fn derive_composite(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_composite(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_composite(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "Composite does not support generic structs",
        ));
    }

    let db_type = parse_composite_type_options(&input.attrs)?.ok_or_else(|| {
        syn::Error::new(
            struct_name.span(),
            "Composite requires #[composite(db_type = \"...\")]",
        )
    })?;

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Composite can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Composite requires named fields",
            ));
        }
    };

    let mut field_idents = Vec::<Ident>::new();
    let mut field_types = Vec::<Type>::new();
    let mut field_options = Vec::<CompositeFieldOptions>::new();

    for field in named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Composite requires named fields"))?;
        field_options.push(parse_composite_field_options(&field.attrs)?);
        field_idents.push(ident);
        field_types.push(field.ty);
    }

    let field_builders = field_idents
        .iter()
        .zip(field_types.iter())
        .zip(field_options.iter())
        .map(|((ident, ty), options)| {
            let attribute_name = ident.to_string();
            let storage_name = options
                .column_name
                .clone()
                .unwrap_or_else(|| attribute_name.clone());
            let default_step = match &options.default {
                Some(expr) => quote! {
                    .default_with(|| {
                        let value: #ty = #expr;
                        <#ty as ::pgcomposite::CompositeScalar>::into_value(value)
                    })
                },
                None => quote! {
                    .default_opt(<#ty as ::pgcomposite::CompositeScalar>::default_value())
                },
            };

            quote! {
                {
                    let field = ::pgcomposite::CompositeField::new(
                        #attribute_name,
                        <#ty as ::pgcomposite::CompositeScalar>::data_type(),
                    )
                    .column(#storage_name);
                    let field = if <#ty as ::pgcomposite::CompositeScalar>::NULLABLE {
                        field.nullable()
                    } else {
                        field
                    };
                    field #default_step
                }
            }
        })
        .collect::<Vec<_>>();

    let into_args = field_idents.iter().zip(field_types.iter()).map(|(ident, ty)| {
        quote! {
            .arg(<#ty as ::pgcomposite::CompositeScalar>::into_value(self.#ident))
        }
    });

    let from_fields = field_idents.iter().zip(field_types.iter()).map(|(ident, ty)| {
        let attribute_name = ident.to_string();
        quote! {
            #ident: <#ty as ::pgcomposite::CompositeScalar>::from_value(
                value.require(#attribute_name)?,
            )?
        }
    });

    Ok(quote! {
        impl ::pgcomposite::CompositeType for #struct_name {
            const DB_TYPE: &'static str = #db_type;

            fn descriptor() -> ::pgcomposite::Result<::pgcomposite::CompositeDescriptor> {
                ::pgcomposite::CompositeDescriptor::builder(#db_type)
                    .name(stringify!(#struct_name))
                    .module(module_path!())
                    #(.field(#field_builders))*
                    .build()
            }

            fn into_args(self) -> ::pgcomposite::CompositeArgs {
                ::pgcomposite::CompositeArgs::new()
                    #(#into_args)*
            }

            fn from_composite(
                value: &::pgcomposite::CompositeValue,
            ) -> ::pgcomposite::Result<Self> {
                Ok(Self {
                    #(#from_fields,)*
                })
            }
        }
    })
}

#[derive(Default)]
struct CompositeFieldOptions {
    column_name: Option<String>,
    default: Option<Expr>,
}

fn parse_composite_type_options(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut db_type = None;

    for attr in attrs {
        if !attr.path().is_ident("composite") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("db_type") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                db_type = Some(lit.value());
                return Ok(());
            }

            Err(meta.error("Unsupported composite attribute. Supported: db_type = \"...\""))
        })?;
    }

    Ok(db_type)
}

fn parse_composite_field_options(attrs: &[syn::Attribute]) -> syn::Result<CompositeFieldOptions> {
    let mut options = CompositeFieldOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("composite") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let value = meta.value()?;
                let lit: LitStr = value.parse()?;
                options.column_name = Some(lit.value());
                return Ok(());
            }

            if meta.path.is_ident("default") {
                if options.default.is_some() {
                    return Err(meta.error("Duplicate default for composite field"));
                }
                let value = meta.value()?;
                options.default = Some(value.parse()?);
                return Ok(());
            }

            Err(meta.error(
                "Unsupported composite field option. Supported: default = <expr>, column = \"...\"",
            ))
        })?;
    }

    Ok(options)
}
