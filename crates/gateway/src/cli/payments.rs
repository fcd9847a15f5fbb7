use std::path::Path;

use crate::runtime::queue;

/// Print the dead-letter journal.  Returns how many dead jobs there are.
pub fn dead(state_path: &Path) -> anyhow::Result<usize> {
    let dead = queue::dead_letters(state_path)
        .map_err(|e| anyhow::anyhow!("reading dead payment jobs: {e}"))?;
    if dead.is_empty() {
        println!("No dead payment jobs.");
        return Ok(0);
    }
    for d in &dead {
        println!(
            "{}  {}  {}  attempts={}  {}",
            d.failed_at.to_rfc3339(),
            d.job.id,
            d.job.notification.reference,
            d.job.attempt + 1,
            d.error,
        );
    }
    println!("\n{} dead job(s)", dead.len());
    Ok(dead.len())
}

/// Move dead jobs back to the pending journal for the next `serve`.
pub fn requeue(state_path: &Path) -> anyhow::Result<usize> {
    let count = queue::requeue_dead(state_path)
        .map_err(|e| anyhow::anyhow!("requeueing dead payment jobs: {e}"))?;
    println!("Requeued {count} payment job(s); they run on the next start.");
    Ok(count)
}
