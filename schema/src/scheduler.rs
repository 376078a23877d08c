use crate::{Sequence, SequencingError};

/// Computes a conflict-free landing schedule for a sequence
pub trait Scheduler: Send + Sync {
    /// Assigns runways and landing times to every schedulable flight in the sequence.
    ///
    /// A flight that cannot be scheduled keeps its previous schedule; the rest of the
    /// pass still runs and the first such failure is returned.
    fn schedule(&self, sequence: &mut Sequence) -> Result<(), SequencingError>;
}
