//! NamingService (C1) and PathResolver (C2): the single authority every
//! other component calls when it needs a path or an episode ID.

pub mod naming;
pub mod resolver;

pub use naming::{slugify, NamingService, ShowMappings, UNCATEGORIZED};
pub use resolver::PathResolver;
