mod history;

pub use history::{CellOffsets, CellRecord, Located, OffsetEntry, SessionHistory};
