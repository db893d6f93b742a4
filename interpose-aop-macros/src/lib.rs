//! Interpose AOP 过程宏
//!
//! 提供 `#[aspect]` 属性宏：
//! - 为 impl 块中的处理方法生成 `Aspect` 实现（按方法名查找处理函数）
//! - 为带 `#[before(..)]`/`#[around(..)]`/`#[after(..)]` 的方法自动注册切点

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::{parse_macro_input, ItemImpl};

mod aspect;

/// `#[aspect]` 宏
///
/// 标注在切面类型的 impl 块上。处理方法接收 `&self` 和连接点，
/// 返回 `()`、`Value`、`AopResult<()>` 或 `AopResult<Value>`。
///
/// 方法属性：
/// - `#[handler]` 只作为处理函数暴露，由手动构建的切点引用
/// - `#[before(target = "...", pattern = "...", order = 0)]` 等同时注册切点，
///   `order` 可省略（默认 0）；省略 `target` 和 `pattern` 时等同 `#[handler]`
///
/// 自动注册要求类型实现 `Default`。
///
/// 使用示例：
/// ```ignore
/// use interpose_aop::prelude::*;
/// use interpose_aop_macros::aspect;
///
/// #[derive(Default)]
/// pub struct AuditAspect;
///
/// #[aspect(name = "Audit")]
/// impl AuditAspect {
///     #[before(target = "UserService", pattern = ".* UserService->save.*(.*)", order = 1)]
///     fn audit(&self, jp: &JoinPoint<'_>) {
///         tracing::info!("saving {:?}", jp.arguments());
///     }
///
///     #[around(target = "UserService", pattern = ".* UserService->find(.*)")]
///     fn cached(&self, jp: &mut JoinPoint<'_>) -> AopResult<Value> {
///         jp.proceed()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn aspect(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = aspect::AspectArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);

    let item_impl = parse_macro_input!(item as ItemImpl);
    aspect::impl_aspect(args, item_impl)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
