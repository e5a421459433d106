pub mod auto_confirm;
pub mod mistakes;
pub mod normalize;
pub mod practice;
pub mod pronunciation;

pub use mistakes::{MistakeBook, MistakeEntry};
pub use normalize::normalize;
pub use practice::{CharacterSlot, Confirmation, MistakeRecord, PracticeEngine, SlotStatus};
pub use pronunciation::{PinyinDictionary, PronunciationSource, TableDictionary};
