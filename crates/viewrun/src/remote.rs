//! # Remote Capability Set
//!
//! Methods on the other side of the bridge are declared up front as types, so a
//! call site names a method the compiler knows about and passes arguments of the
//! declared shape. The same declaration is used by the exposing side through
//! [`Api::implement`](crate::api::Api::implement).

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A method callable across the bridge.
pub trait RemoteMethod {
    /// The method name on the wire.
    const NAME: &'static str;
    /// Positional arguments, usually a tuple.
    type Args: Serialize;
    /// The value the call resolves to.
    type Output: DeserializeOwned;
}

/// Declares a set of [`RemoteMethod`] marker types.
///
/// ```
/// use viewrun::remote_methods;
///
/// remote_methods! {
///     /// Adds two numbers on the page.
///     pub Add = "add"(i64, i64) -> i64;
///     pub Ping = "ping"() -> String;
/// }
/// ```
#[macro_export]
macro_rules! remote_methods {
    ($( $(#[$meta:meta])* $vis:vis $ty:ident = $name:literal ( $($arg:ty),* $(,)? ) -> $out:ty; )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            $vis struct $ty;

            impl $crate::remote::RemoteMethod for $ty {
                const NAME: &'static str = $name;
                type Args = ( $($arg,)* );
                type Output = $out;
            }
        )*
    };
}
