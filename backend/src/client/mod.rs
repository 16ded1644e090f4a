//! Consumer-side helpers: a local material cache and the reconciler that
//! merges it with the server's durable list.

mod cache;
mod reconciler;

pub use cache::{CacheError, CachedMaterial, FsMaterialCache, LocalMaterialCache};
pub use reconciler::{CacheReconciler, MaterialView, PromoteError, Promotion, merge};

#[cfg(test)]
pub use cache::MockLocalMaterialCache;
