pub(crate) mod filters;
pub(crate) mod pipeline;
pub(crate) mod pool;
