//! Assignment commands - read and edit the persisted assignments directly

use clap::Args;
use tracing::info;

use crate::domain::experiment::PersistedAssignments;
use crate::domain::storage::KeyValueStore;

use super::{init, open_persistent_store};

/// Arguments for the show command
#[derive(Args, Clone)]
pub struct ShowArgs {
    /// Print the raw JSON payload
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the set command
#[derive(Args, Clone)]
pub struct SetArgs {
    /// Experiment name
    pub experiment: String,

    /// Variant name to pin
    pub variant: String,
}

/// List persisted assignments
pub fn show(args: ShowArgs) -> anyhow::Result<()> {
    let config = init();
    let store = open_persistent_store(&config)?;
    let assignments = read_assignments(store.as_ref(), &config.storage.persist_key)?;

    if args.json {
        println!("{}", assignments.to_json()?);
        return Ok(());
    }

    if assignments.is_empty() {
        println!("No persisted assignments");
    }
    for (experiment, variant) in assignments.entries() {
        println!("{}\t{}", experiment, variant);
    }

    Ok(())
}

/// Pin an experiment to a variant
///
/// The pinned name is used as the forced variant the next time the
/// experiment activates.
pub fn set(args: SetArgs) -> anyhow::Result<()> {
    if args.experiment.trim().is_empty() || args.variant.trim().is_empty() {
        anyhow::bail!("Experiment and variant names cannot be empty");
    }

    let config = init();
    let store = open_persistent_store(&config)?;

    if pin(store.as_ref(), &config.storage.persist_key, &args.experiment, &args.variant)? {
        info!(experiment = %args.experiment, variant = %args.variant, "Assignment pinned");
    }

    println!("{}\t{}", args.experiment, args.variant);
    Ok(())
}

/// Remove every persisted assignment
pub fn clear() -> anyhow::Result<()> {
    let config = init();
    let store = open_persistent_store(&config)?;

    store.set_item(
        &config.storage.persist_key,
        &PersistedAssignments::new().to_json()?,
    )?;
    info!(key = %config.storage.persist_key, "Assignments cleared");

    Ok(())
}

/// Record `experiment -> variant`, returning whether the store was written
fn pin(
    store: &dyn KeyValueStore,
    key: &str,
    experiment: &str,
    variant: &str,
) -> anyhow::Result<bool> {
    let mut assignments = read_assignments(store, key)?;

    if !assignments.set(experiment, variant) {
        return Ok(false);
    }

    store.set_item(key, &assignments.to_json()?)?;
    Ok(true)
}

fn read_assignments(store: &dyn KeyValueStore, key: &str) -> anyhow::Result<PersistedAssignments> {
    match store.get_item(key)? {
        Some(raw) if !raw.is_empty() => Ok(PersistedAssignments::parse(&raw)?),
        _ => Ok(PersistedAssignments::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::experiment::PERSIST_KEY;
    use crate::infrastructure::storage::FileStore;

    #[test]
    fn test_pinned_assignment_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiments.json");

        let written = pin(&FileStore::new(&path), PERSIST_KEY, "checkout", "green").unwrap();
        assert!(written);

        let assignments = read_assignments(&FileStore::new(&path), PERSIST_KEY).unwrap();
        assert_eq!(assignments.get("checkout"), Some("green"));
    }

    #[test]
    fn test_pinning_same_variant_skips_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("experiments.json"));

        assert!(pin(&store, PERSIST_KEY, "checkout", "green").unwrap());
        assert!(!pin(&store, PERSIST_KEY, "checkout", "green").unwrap());
        assert!(pin(&store, PERSIST_KEY, "checkout", "blue").unwrap());

        let assignments = read_assignments(&store, PERSIST_KEY).unwrap();
        assert_eq!(assignments.entries().len(), 1);
        assert_eq!(assignments.get("checkout"), Some("blue"));
    }

    #[test]
    fn test_corrupt_payload_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("experiments.json"));
        store.set_item(PERSIST_KEY, "{not json").unwrap();

        assert!(read_assignments(&store, PERSIST_KEY).is_err());
        assert!(pin(&store, PERSIST_KEY, "checkout", "green").is_err());
    }
}
