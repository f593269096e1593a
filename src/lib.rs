//! Span-aware text transformation for entity-annotated benchmark corpora.
//!
//! `respan` rewrites annotated document text (whitespace repair around
//! glued mentions, in-text mention markers, sentence segmentation) while
//! keeping every annotation's character offsets pointing at its text.
//! Interacting spans (overlapping or nested mentions) are rewritten as one
//! unit through a per-character ownership map, so an insertion inside one
//! mention moves every affected span consistently.
//!
//! All offsets are character offsets. Multi-byte text is handled through
//! the helpers in [`offset`]; nothing in the crate indexes a string by
//! byte position.
//!
//! ```
//! use respan::prelude::*;
//!
//! let annotations = vec![Annotation::new(
//!     4,
//!     8,
//!     "IL-6",
//!     EntityType::Gene,
//!     vec!["3569".into()],
//! )];
//! let mut example = Example::from_text_and_annotations(
//!     "doc-1",
//!     vec![("title".into(), "the IL-6alpha level".into())],
//!     annotations,
//! );
//! example.prepare()?;
//!
//! let clean = CleanIntraWordMentions::new(DropPolicy::Raise);
//! let example = clean.safe_apply(example)?;
//!
//! assert_eq!(example.passages[0].text, "the IL-6 alpha level");
//! check_offsets(&example)?;
//! check_no_intra_word_mentions(&example)?;
//! # Ok::<(), respan::Error>(())
//! ```

#![warn(missing_docs)]

pub mod data;
pub mod error;
pub mod group;
pub mod index;
pub mod offset;
pub mod qaqc;
pub mod transform;

pub use error::{Error, Result};

/// Common imports for working with annotated examples.
pub mod prelude {
    pub use crate::data::{Annotation, EntityType, Example, Identifiers, Passage, Snapshot};
    pub use crate::error::{Error, Result};
    pub use crate::qaqc::{check_no_intra_word_mentions, check_offsets};
    pub use crate::transform::clean::CleanIntraWordMentions;
    pub use crate::transform::mark::AddMentionMarkers;
    pub use crate::transform::segment::{HeuristicSplitter, SentenceSplitter, SplitIntoSentences};
    pub use crate::transform::{DropPolicy, Transformation};
}
