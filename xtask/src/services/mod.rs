pub(crate) mod descriptors;
pub(crate) mod platform;
pub(crate) mod utils;
