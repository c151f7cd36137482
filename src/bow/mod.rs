pub mod control;
pub mod crc;
pub mod log;
pub mod remap;
pub mod restore;

pub use control::{BowControl, BowState};
pub use crc::{chained_crc32, ChainedCrc};
pub use log::{BowLogEntry, BowLogSector, RawHeader, BOW_MAGIC};
pub use remap::RemapTable;
pub use restore::RestoreEngine;
