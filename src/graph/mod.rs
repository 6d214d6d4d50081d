pub(crate) mod audio;
pub(crate) mod chain;
pub(crate) mod compiler;
pub(crate) mod concat;
pub(crate) mod node;
pub(crate) mod overlay;
