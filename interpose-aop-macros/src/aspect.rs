//! `#[aspect]` 宏实现

use proc_macro2::TokenStream;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Error, Expr, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Result, Type};

const ADVICE_ATTRS: [&str; 3] = ["before", "around", "after"];

/// `#[aspect(...)]` 的参数
#[derive(Default)]
pub struct AspectArgs {
    name: Option<LitStr>,
}

impl AspectArgs {
    pub fn parse(&mut self, meta: ParseNestedMeta) -> Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported aspect property, expected `name`"))
        }
    }
}

/// 方法上的通知属性
struct AdviceAttr {
    kind: syn::Ident,
    target: Option<LitStr>,
    pattern: Option<LitStr>,
    order: Option<Expr>,
}

impl AdviceAttr {
    fn from_attribute(attr: &syn::Attribute) -> Result<Self> {
        let kind = attr
            .path()
            .get_ident()
            .cloned()
            .ok_or_else(|| Error::new_spanned(attr, "expected advice attribute"))?;

        let mut advice = Self {
            kind,
            target: None,
            pattern: None,
            order: None,
        };

        // #[before] 没有参数时只作为处理函数
        if matches!(attr.meta, syn::Meta::Path(_)) {
            return Ok(advice);
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("target") {
                advice.target = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("pattern") {
                advice.pattern = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("order") {
                advice.order = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported advice property, expected `target`, `pattern` or `order`"));
            }
            Ok(())
        })?;

        Ok(advice)
    }

    fn advice_type(&self) -> TokenStream {
        match self.kind.to_string().as_str() {
            "before" => quote!(interpose_aop::AdviceType::Before),
            "around" => quote!(interpose_aop::AdviceType::Around),
            _ => quote!(interpose_aop::AdviceType::After),
        }
    }
}

/// 一个处理方法及其通知属性
struct HandlerMethod {
    ident: syn::Ident,
    advice: Vec<AdviceAttr>,
}

pub fn impl_aspect(args: AspectArgs, mut item_impl: ItemImpl) -> Result<TokenStream> {
    if let Some((_, path, _)) = &item_impl.trait_ {
        return Err(Error::new_spanned(path, "#[aspect] must be placed on an inherent impl block"));
    }

    let self_ty = (*item_impl.self_ty).clone();
    let aspect_name = match args.name {
        Some(name) => name.value(),
        None => type_name(&self_ty)?,
    };

    let mut handlers = Vec::new();
    for item in &mut item_impl.items {
        if let ImplItem::Fn(method) = item {
            if let Some(handler) = take_handler(method)? {
                handlers.push(handler);
            }
        }
    }

    if handlers.is_empty() {
        return Err(Error::new_spanned(
            &item_impl.self_ty,
            "#[aspect] requires at least one method marked #[handler], #[before], #[around] or #[after]",
        ));
    }

    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    let arms = handlers.iter().map(|handler| {
        let ident = &handler.ident;
        let method = ident.to_string();
        quote! {
            #method => ::core::option::Option::Some(interpose_aop::AdviceHandler::new(move |jp| {
                interpose_aop::IntoAdviceResult::into_advice_result(self.#ident(jp))
            })),
        }
    });

    let mut registrations = Vec::new();
    for handler in &handlers {
        for advice in &handler.advice {
            if let Some(registration) = registration(&self_ty, &handler.ident, advice)? {
                registrations.push(registration);
            }
        }
    }

    Ok(quote! {
        #item_impl

        impl #impl_generics interpose_aop::Aspect for #self_ty #where_clause {
            fn name(&self) -> &str {
                #aspect_name
            }

            fn handler(
                self: ::std::sync::Arc<Self>,
                method: &str,
            ) -> ::core::option::Option<interpose_aop::AdviceHandler> {
                match method {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        #(#registrations)*
    })
}

/// 取出方法上的通知属性；不是处理方法时返回 None
fn take_handler(method: &mut ImplItemFn) -> Result<Option<HandlerMethod>> {
    let mut is_handler = false;
    let mut advice = Vec::new();
    let mut kept = Vec::with_capacity(method.attrs.len());

    for attr in method.attrs.drain(..) {
        if attr.path().is_ident("handler") {
            is_handler = true;
        } else if ADVICE_ATTRS.iter().any(|name| attr.path().is_ident(name)) {
            is_handler = true;
            advice.push(AdviceAttr::from_attribute(&attr)?);
        } else {
            kept.push(attr);
        }
    }
    method.attrs = kept;

    if !is_handler {
        return Ok(None);
    }

    let sig = &method.sig;
    let has_self_ref = matches!(
        sig.inputs.first(),
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some()
    );
    if !has_self_ref || sig.inputs.len() != 2 {
        return Err(Error::new_spanned(
            sig,
            "advice handler must take `&self` and a join point, e.g. `fn audit(&self, jp: &JoinPoint<'_>)`",
        ));
    }

    Ok(Some(HandlerMethod {
        ident: sig.ident.clone(),
        advice,
    }))
}

fn registration(self_ty: &Type, ident: &syn::Ident, advice: &AdviceAttr) -> Result<Option<TokenStream>> {
    let (target, pattern) = match (&advice.target, &advice.pattern) {
        (Some(target), Some(pattern)) => (target, pattern),
        (None, None) => return Ok(None),
        _ => {
            return Err(Error::new_spanned(
                &advice.kind,
                "advice registration requires both `target` and `pattern`",
            ))
        }
    };

    let advice_type = advice.advice_type();
    let order = advice.order.clone().unwrap_or_else(|| syn::parse_quote!(0));
    let method = ident.to_string();

    Ok(Some(quote! {
        interpose_aop::inventory::submit! {
            interpose_aop::AspectRegistration::new(
                #target,
                #pattern,
                #advice_type,
                #order,
                #method,
                || ::std::sync::Arc::new(<#self_ty as ::core::default::Default>::default())
                    as ::std::sync::Arc<dyn interpose_aop::Aspect>
            )
        }
    }))
}

fn type_name(ty: &Type) -> Result<String> {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| Error::new_spanned(ty, "cannot derive aspect name from type")),
        _ => Err(Error::new_spanned(
            ty,
            "#[aspect] requires a named type, or an explicit `#[aspect(name = \"...\")]`",
        )),
    }
}
