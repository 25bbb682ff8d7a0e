// Location Selector - CLI
// Saved city/township records: list, show, add, update, delete.

use anyhow::{bail, Result};
use rusqlite::Connection;
use std::env;

use location_selector::{
    delete_location, get_location, insert_location, list_locations, setup_database,
    update_location, CityTownshipSelector, Config, FileReferenceSource, Materializer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = Config::from_env();

    match args.get(1).map(String::as_str) {
        None | Some("list") => run_list(&config),
        Some("show") => match args.get(2) {
            Some(id) => run_show(&config, id),
            None => usage(),
        },
        Some("add") => match (args.get(2), args.get(3)) {
            (Some(city), Some(township)) => run_add(&config, city, township).await,
            _ => usage(),
        },
        Some("update") => match (args.get(2), args.get(3), args.get(4)) {
            (Some(id), Some(city), Some(township)) => {
                run_update(&config, id, city, township).await
            }
            _ => usage(),
        },
        Some("delete") => match args.get(2) {
            Some(id) => run_delete(&config, id),
            None => usage(),
        },
        Some(_) => usage(),
    }
}

fn usage() -> Result<()> {
    eprintln!("Usage:");
    eprintln!("  location-selector [list]");
    eprintln!("  location-selector show <id>");
    eprintln!("  location-selector add <cityId> <townshipId>");
    eprintln!("  location-selector update <id> <cityId> <townshipId>");
    eprintln!("  location-selector delete <id>");
    std::process::exit(1);
}

fn open_db(config: &Config) -> Result<Connection> {
    let conn = Connection::open(&config.database_path)?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_list(config: &Config) -> Result<()> {
    let conn = open_db(config)?;
    let records = list_locations(&conn)?;

    if records.is_empty() {
        println!("No saved records.");
        return Ok(());
    }

    println!("📍 {} saved record(s), newest first:\n", records.len());
    for record in &records {
        println!(
            "  {}  {} - {}  (saved {})",
            record.id,
            record.city_name,
            record.township_name,
            record.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

fn run_show(config: &Config, id: &str) -> Result<()> {
    let conn = open_db(config)?;

    let Some(record) = get_location(&conn, id)? else {
        bail!("Record not found: {}", id);
    };

    println!("📍 {}", record.full_address);
    println!("   city:     {} ({})", record.city_name, record.city_id);
    println!("   township: {} ({})", record.township_name, record.township_id);
    println!("   created:  {}", record.created_at.to_rfc3339());
    if let Some(updated_at) = record.updated_at {
        println!("   updated:  {}", updated_at.to_rfc3339());
    }

    Ok(())
}

async fn run_add(config: &Config, city_id: &str, township_id: &str) -> Result<()> {
    let source = FileReferenceSource::new(&config.reference_dir);

    // Walk the same path the form does: load the lists, pick the city
    // (which refreshes and reconciles the township options), then pick
    // the township.
    let mut selector = CityTownshipSelector::new(source.clone());
    selector.initialize(None, None).await?;
    println!("✓ Loaded {} cities", selector.cities().len());

    selector.set_city(city_id).await?;
    println!(
        "✓ {} township(s) under city {}",
        selector.townships().len(),
        city_id
    );
    selector.set_township(township_id);

    let selection = selector.current_selection();
    if !selection.is_complete() {
        bail!("Both cityId and townshipId are required");
    }

    let payload = Materializer::new(source)
        .materialize(&selection.city_id, &selection.township_id)
        .await?;

    let conn = open_db(config)?;
    let record = insert_location(&conn, &payload)?;

    println!("✅ Saved {} ({})", record.full_address, record.id);
    Ok(())
}

async fn run_update(config: &Config, id: &str, city_id: &str, township_id: &str) -> Result<()> {
    let conn = open_db(config)?;

    let Some(existing) = get_location(&conn, id)? else {
        bail!("Record not found: {}", id);
    };

    let source = FileReferenceSource::new(&config.reference_dir);

    // Seed with the stored pair (the edit form opens pre-filled), then
    // apply the requested changes through the reconciler.
    let mut selector = CityTownshipSelector::new(source.clone());
    selector
        .initialize(Some(&existing.city_id), Some(&existing.township_id))
        .await?;
    selector.set_city(city_id).await?;
    selector.set_township(township_id);

    let selection = selector.current_selection();
    if !selection.is_complete() {
        bail!("Both cityId and townshipId are required");
    }

    let payload = Materializer::new(source)
        .materialize(&selection.city_id, &selection.township_id)
        .await?;

    let Some(record) = update_location(&conn, id, &payload)? else {
        bail!("Record not found: {}", id);
    };

    println!("✅ Updated {} ({})", record.full_address, record.id);
    Ok(())
}

fn run_delete(config: &Config, id: &str) -> Result<()> {
    let conn = open_db(config)?;

    if !delete_location(&conn, id)? {
        bail!("Record not found: {}", id);
    }

    println!("✅ Deleted {}", id);
    Ok(())
}
