//! Maintenance subcommands. Each takes an opened [`KvStore`] so tests can run
//! them against the in-memory backend.

use anyhow::{bail, Context};
use facetdb_commons::Item;
use facetdb_store::KvStore;
use std::io::{Read, Write};

/// Writes every item as a JSON array. Returns the number exported.
pub async fn export<W: Write>(store: &KvStore, mut out: W, pretty: bool) -> anyhow::Result<usize> {
    let items = store.export().await.context("Export failed")?;
    if pretty {
        serde_json::to_writer_pretty(&mut out, &items)?;
    } else {
        serde_json::to_writer(&mut out, &items)?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(items.len())
}

/// Reads a JSON array of items and upserts them. Returns the number imported.
pub async fn import<R: Read>(store: &KvStore, input: R) -> anyhow::Result<usize> {
    let items: Vec<Item> =
        serde_json::from_reader(input).context("Input must be a JSON array of objects")?;
    let count = store.import(items).await.context("Import failed")?;
    Ok(count)
}

pub async fn truncate(store: &KvStore, confirmed: bool) -> anyhow::Result<usize> {
    if !confirmed {
        bail!("Refusing to truncate without --yes");
    }
    let removed = store.truncate().await.context("Truncate failed")?;
    Ok(removed)
}

pub async fn stats<W: Write>(store: &KvStore, mut out: W) -> anyhow::Result<()> {
    let stats = store.stats().await.context("Stats failed")?;
    writeln!(out, "backend:    {}", store.backend().name())?;
    writeln!(out, "items:      {}", stats.items)?;
    writeln!(out, "partitions: {}", stats.partitions)?;
    Ok(())
}
