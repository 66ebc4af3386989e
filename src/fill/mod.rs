// Gap filling passes
//
// Each pass walks every row independently and writes into the matrix in
// place. Within a row the scan order matters: later decisions read values
// written earlier in the same pass.
//
// - bridge: equal-neighbor gaps
// - propagate: trailing gaps up to the last agreement's month
// - decide: remaining interior gaps by nearest-neighbor tie-break

pub mod bridge;
pub mod decide;
pub mod propagate;

pub use bridge::{bridge_equal_neighbors, bridge_row};
pub use decide::{decide_gaps, decide_row};
pub use propagate::{propagate_right, propagate_row};
