pub mod duration;
pub mod library;
pub mod notes;
pub mod phrase;
pub mod rhythm;

pub use duration::Duration;
pub use library::RhythmLibrary;
pub use phrase::{Phrase, PhraseTable, Scale};
pub use rhythm::{Hit, Part, Rhythm, RhythmBuilder};
