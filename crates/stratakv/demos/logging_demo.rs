use stratakv::logging::LogConfig;
use stratakv::{KeyValueDb, OperatingMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Debug level shows resolved tuning and each shutdown step.
    let _guard = LogConfig::debug().init()?;

    println!("=== stratakv Logging Demo ===\n");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("logged");

    println!("1. Initializing (logs path)...");
    let db = stratakv::initialize(&path)?;

    println!("\n2. Creating a collection (logs at debug)...");
    let notes = db.create_collection("notes")?;
    db.put(notes, b"note:1", b"hello")?;

    println!("\n3. Closing (logs sync-wal and flush-all steps)...");
    db.close()?;

    println!("\n4. Bulk-load close logs a compaction warning...");
    let db = stratakv::open(&path, OperatingMode::BulkLoad)?;
    db.close()?;

    println!("\n5. Destroying...");
    stratakv::destroy(&path)?;

    println!("\n=== Demo Complete ===");
    Ok(())
}
