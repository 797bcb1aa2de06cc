//! Helpers for reaching the network from inside an event.

use crate::sim::World;
use tracing::error;

use super::{NetWorld, Network};

/// Downcast the world to `NetWorld` and run `f` on its network.
///
/// Returns `None` (and logs) if the world is some other type; events
/// treat that as a no-op.
pub(crate) fn with_network<F, R>(world: &mut dyn World, f: F) -> Option<R>
where
    F: FnOnce(&mut Network) -> R,
{
    match world.as_any_mut().downcast_mut::<NetWorld>() {
        Some(w) => Some(f(&mut w.net)),
        None => {
            error!("world must be NetWorld; event ignored");
            None
        }
    }
}
