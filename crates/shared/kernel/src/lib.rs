//! Kernel utilities shared across slices.
//! Keep this crate lightweight: configuration loading, the application state
//! handed to every handler, and the system routes.
//!
//! ## Config loading
//! ```rust,ignore
//! use qpay_kernel::config::load_config;
//! let cfg: qpay_kernel::domain::config::ApiConfig = load_config(None::<&str>)?;
//! ```
pub mod config;
#[cfg(feature = "server")]
pub mod server;

pub use qpay_domain as domain;

/// Declares a feature slice handle around an inner state struct.
///
/// Generates an `Arc` wrapper with `new`, `Deref` to the inner state and the
/// [`FeatureSlice`](crate::domain::registry::FeatureSlice) impl used by the registry.
///
/// ```rust
/// #[derive(Debug)]
/// pub struct LedgerInner {
///     pub name: String,
/// }
///
/// qpay_kernel::feature_slice!(pub struct Ledger => LedgerInner);
///
/// let ledger = Ledger::new(LedgerInner { name: "main".to_owned() });
/// assert_eq!(ledger.name, "main");
/// ```
#[macro_export]
macro_rules! feature_slice {
    ($(#[$meta:meta])* $vis:vis struct $name:ident => $inner:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            inner: ::std::sync::Arc<$inner>,
        }

        impl $name {
            #[must_use]
            pub fn new(inner: $inner) -> Self {
                Self { inner: ::std::sync::Arc::new(inner) }
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl $crate::domain::registry::FeatureSlice for $name {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
}
