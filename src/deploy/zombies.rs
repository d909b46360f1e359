// ABOUTME: Zombie detection: machines left behind by failed deployments.
// ABOUTME: Tag bookkeeping plus the retried force-destroy primitive.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::fleet::{FleetApi, FleetError};
use crate::types::{GenerationTag, InvalidGenerationTag, MachineId};

use super::bluegreen::MachineUpdateEntry;

const DESTROY_ATTEMPTS: u32 = 3;
const DESTROY_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Normalize every entry's generation tag (absent becomes `UNTAGGED`, and
/// the normalized value is written back to the spec's metadata) and return
/// the distinct tags present.
pub(crate) fn normalize_tags(
    entries: &mut [MachineUpdateEntry],
) -> Result<BTreeSet<GenerationTag>, InvalidGenerationTag> {
    let mut tags = BTreeSet::new();

    for entry in entries {
        let metadata = &mut entry.launch_spec.config.metadata;
        let tag = GenerationTag::from_metadata(metadata)?;
        tag.store(metadata);
        tags.insert(tag);
    }

    Ok(tags)
}

/// Tags belonging to prior failed deployments.
///
/// The newest (largest) tag is the generation that most recently won; every
/// older tag is evidence of a deployment that created machines and never
/// retired its predecessor.
pub(crate) fn zombie_tags(tags: &BTreeSet<GenerationTag>) -> BTreeSet<GenerationTag> {
    let mut zombies = tags.clone();
    if let Some(newest) = zombies.iter().next_back().copied() {
        zombies.remove(&newest);
    }
    zombies
}

/// Force-destroy with a short fixed-delay retry. The fleet occasionally
/// races its own teardown bookkeeping, so a couple of retries clears
/// transient conflicts.
pub(crate) async fn destroy_with_retry<F: FleetApi + ?Sized>(
    fleet: &F,
    id: &MachineId,
) -> Result<(), FleetError> {
    let mut attempt = 1;
    loop {
        match fleet.destroy(id, true).await {
            Ok(()) => return Ok(()),
            Err(err) if attempt >= DESTROY_ATTEMPTS => return Err(err),
            Err(err) => {
                tracing::debug!(machine = %id, attempt, error = %err, "zombie destroy retrying");
                attempt += 1;
                tokio::time::sleep(DESTROY_RETRY_DELAY).await;
            }
        }
    }
}
