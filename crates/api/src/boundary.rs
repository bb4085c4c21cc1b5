//! Transition windows located by the boundary search.

/// A window bracketing a detected change in some keyed sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Boundary<I> {
    /// The two ends of the searched range share an equivalence class, so
    /// no transition is detectable there.
    NotFound,

    /// A transition lies between `lo` and `hi`, and the window cannot be
    /// narrowed further.
    Found {
        /// Last index known to be in the earlier class.
        lo: I,

        /// First index known to be in the later class.
        hi: I,
    },
}

impl<I: Copy> Boundary<I> {
    /// The `(lo, hi)` pair, if a transition was found.
    pub fn window(&self) -> Option<(I, I)> {
        match self {
            Self::NotFound => None,
            Self::Found { lo, hi } => Some((*lo, *hi)),
        }
    }
}
