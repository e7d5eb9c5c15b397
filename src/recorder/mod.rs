mod trajectory;

pub use trajectory::{TrajectoryRecorder, TrajectoryRow, read_rows_from_disk};
