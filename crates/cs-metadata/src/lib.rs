//! # cs-metadata
//!
//! Resolves the descriptive metadata of a comic archive from layered
//! sources. Each source is a [`ResolveStrategy`]; the [`Resolver`] runs them
//! in precedence order and merges the results field by field:
//!
//! 1. Embedded `ComicInfo.xml` ([`EmbeddedStrategy`])
//! 2. File name patterns ([`FilenameStrategy`])
//! 3. Parent directory and sibling position ([`DirectoryStrategy`])
//!
//! Resolution never fails. Missing series and number become `"Unknown"`
//! and `"0"`.
//!
//! ```
//! use cs_metadata::{ResolveInput, Resolver};
//! use std::path::Path;
//!
//! let resolver = Resolver::default();
//! let meta = resolver.resolve(&ResolveInput::new(Path::new("/comics/Saga 012 (2013).cbz")));
//! assert_eq!(meta.series, "Saga");
//! assert_eq!(meta.number.as_str(), "012");
//! assert_eq!(meta.year, Some(2013));
//! ```

pub mod directory;
pub mod embedded;
pub mod filename;
pub mod normalize;
pub mod resolver;
pub mod strategy;
pub mod types;

pub use directory::DirectoryStrategy;
pub use embedded::EmbeddedStrategy;
pub use filename::FilenameStrategy;
pub use resolver::{Resolver, UNKNOWN_SERIES};
pub use strategy::ResolveStrategy;
pub use types::{PartialMetadata, ResolveInput};
