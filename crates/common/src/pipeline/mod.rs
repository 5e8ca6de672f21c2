//! Content pipelines built on the provider traits
//!
//! - [`generation`]: topic to stored article
//! - [`images`]: placeholder resolution and hero images
//! - [`translation`]: per-language fan-out of a source article

pub mod generation;
pub mod images;
pub mod translation;

pub use generation::{ArticleDraft, ArticleStyle, ContentGenerator, GenerationOptions, GenerationOutcome};
pub use images::{ImageResolver, ResolvedContent};
pub use translation::{SkipReason, TranslationFanout, TranslationPolicy, TranslationReport};
