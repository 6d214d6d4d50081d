pub(crate) mod builder;
pub(crate) mod concat;
pub(crate) mod model;
pub(crate) mod overlay;
