//! Lifecycle states of the resources tests wait on

use std::fmt;
use std::future::Future;

use crate::poller::{wait_for_state, StateWait};

/// Resource kinds with a known set of valid states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Instance,
    Volume,
    Snapshot,
}

impl ResourceKind {
    /// States a healthy resource of this kind may report
    ///
    /// Anything else during a wait means the resource went somewhere unexpected.
    pub fn valid_states(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Image => &["available", "pending", "failed"],
            ResourceKind::Instance => &[
                "pending",
                "running",
                "shutting-down",
                "terminated",
                "stopping",
                "stopped",
            ],
            ResourceKind::Volume => &[
                "creating",
                "available",
                "in-use",
                "deleting",
                "deleted",
                "error",
            ],
            ResourceKind::Snapshot => &["pending", "completed", "error"],
        }
    }

    pub fn is_valid_state(self, state: &str) -> bool {
        self.valid_states().contains(&state)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Image => "image",
            ResourceKind::Instance => "instance",
            ResourceKind::Volume => "volume",
            ResourceKind::Snapshot => "snapshot",
        };
        write!(f, "{}", name)
    }
}

/// Wait for a resource's status, rejecting states outside its kind's valid set
///
/// # Example
///
/// ```ignore
/// use stratus::resource::{wait_resource_state, ResourceKind};
///
/// wait_resource_state(ResourceKind::Volume, || async { volume_status(&client, &id).await }, "available")
///     .config(timeouts.volume)
///     .await_state()
///     .await?;
/// ```
pub fn wait_resource_state<F, Fut, S, E>(
    kind: ResourceKind,
    probe: F,
    target: S,
) -> StateWait<F, Fut, S, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S, E>>,
    S: PartialEq + fmt::Debug + From<&'static str>,
    E: fmt::Debug + fmt::Display,
{
    wait_for_state(probe, target).valid(kind.valid_states().iter().copied().map(S::from))
}
