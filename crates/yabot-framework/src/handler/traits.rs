//! The [`Handler`] trait.
//!
//! Handlers are plain async functions or closures. Each parameter is an
//! extractor ([`FromContext`]) and the return value is turned into an
//! [`Outcome`](crate::error::Outcome) by [`HandlerResponse`]:
//!
//! ```rust,ignore
//! // No parameters, no return value: always handled
//! async fn ping() {}
//!
//! // Returning a String replies with it
//! async fn echo(msg: Message) -> String {
//!     msg.text.clone()
//! }
//!
//! // Returning false passes the message to the next handler
//! async fn only_digits(msg: Message) -> bool {
//!     msg.text.chars().all(|c| c.is_ascii_digit())
//! }
//! ```

use futures::FutureExt;
use futures::future::BoxFuture;

use super::service::HandlerResponse;
use crate::context::HandlerContext;
use crate::error::HandlerResult;
use crate::extractor::FromContext;

/// An async function usable as an event handler.
///
/// Implemented for functions taking 0 to 12 [`FromContext`] parameters and
/// returning a [`HandlerResponse`].
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Extracts the parameters, calls the function and converts its result.
    fn call(self, ctx: HandlerContext) -> BoxFuture<'static, HandlerResult>;
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: HandlerResponse,
            $( $ty: FromContext + Send + 'static, )*
        {
            fn call(self, ctx: HandlerContext) -> BoxFuture<'static, HandlerResult> {
                async move {
                    $(
                        let $ty = <$ty as FromContext>::from_context(&ctx)?;
                    )*

                    let res = (self)($($ty,)*).await;
                    res.into_outcome(&ctx).await
                }
                .boxed()
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);
