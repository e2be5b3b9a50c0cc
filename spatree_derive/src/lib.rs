/// Derive macro generating an implementation of the trait `Record`.
///
/// The type must be a struct with an `id` field of a primitive integer type and a `position` or
/// `coordinates` field of an array type.
#[proc_macro_derive(Record)]
pub fn record_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse(input);

    impl_record(ast).unwrap_or_else(|e| syn::Error::to_compile_error(&e).into())
}

fn impl_record(input: syn::Result<syn::DeriveInput>) -> syn::Result<proc_macro::TokenStream> {
    let input = input?;

    let struct_data = match &input.data {
        syn::Data::Struct(struct_data) => Ok(struct_data),
        syn::Data::Enum(enum_data) => Err(syn::Error::new_spanned(
            enum_data.enum_token,
            "the `Record` trait can only be derived for struct types",
        )),
        syn::Data::Union(union_data) => Err(syn::Error::new_spanned(
            union_data.union_token,
            "the `Record` trait can only be derived for struct types",
        )),
    }?;

    get_field("id", struct_data)
        .ok_or_else(|| syn::Error::new_spanned(&struct_data.fields, "no `id` field"))?;

    let coordinates = get_field("position", struct_data)
        .or_else(|| get_field("coordinates", struct_data))
        .ok_or_else(|| {
            syn::Error::new_spanned(&struct_data.fields, "no `position` or `coordinates` field")
        })?;
    let coordinates_ident = &coordinates.ident;
    let scalar = match &coordinates.ty {
        syn::Type::Array(array) => Ok(&array.elem),
        ty => Err(syn::Error::new_spanned(
            ty,
            "the coordinates of a `Record` must be an array",
        )),
    }?;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let name = &input.ident;

    Ok(quote::quote! {
        impl #impl_generics ::spatree::storage::Record for #name #ty_generics #where_clause {
            type Scalar = #scalar;

            #[inline]
            fn id(&self) -> ::spatree::PointId {
                self.id as ::spatree::PointId
            }

            #[inline]
            fn coordinates(&self) -> &[Self::Scalar] {
                &self.#coordinates_ident
            }
        }
    }
    .into())
}

fn get_field<'a>(name: &str, struct_data: &'a syn::DataStruct) -> Option<&'a syn::Field> {
    struct_data
        .fields
        .iter()
        .find(|field| field.ident.as_ref().is_some_and(|ident| ident == name))
}
