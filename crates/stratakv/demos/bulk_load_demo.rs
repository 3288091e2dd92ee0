use stratakv::{KeyValueBatch, KeyValueDb, KeyValueIterator, KeyValueReader, OperatingMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog");

    println!("=== stratakv Bulk Load Demo ===\n");

    // Create the database and its collections in normal mode.
    let db = stratakv::initialize(&path)?;
    db.create_collection("products")?;
    db.close()?;

    // Reopen for ingestion: no WAL, no automatic compaction.
    println!("1. Loading 50,000 products in bulk-load mode...");
    let db = stratakv::open(&path, OperatingMode::BulkLoad)?;
    let products = db.collection("products")?;
    for chunk in 0..50 {
        let mut batch = db.begin_writes()?;
        for i in 0..1000 {
            let id = chunk * 1000 + i;
            batch.put(
                products,
                format!("sku:{:06}", id).as_bytes(),
                format!("product #{}", id).as_bytes(),
            )?;
        }
        batch.commit()?;
    }

    // Nothing is crash-safe until this returns; it compacts everything.
    println!("2. Closing (compacting, syncing, flushing)...");
    db.close()?;

    println!("3. Reading back in read-only mode...");
    let db = stratakv::open(&path, OperatingMode::ReadOnly)?;
    let products = db.collection("products")?;
    println!(
        "   sku:012345 = {}",
        String::from_utf8_lossy(&db.get(products, b"sku:012345")?)
    );

    let reader = db.current()?;
    let mut iter = reader.iterator(products, b"sku:049998")?;
    while let Some(key) = iter.key() {
        println!("   tail: {}", String::from_utf8_lossy(key));
        iter.next()?;
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
