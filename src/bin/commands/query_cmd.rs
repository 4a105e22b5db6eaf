use anyhow::{Context, Result};
use geodb::{FieldSet, GeoDatabase};
use serde_json::json;
use std::path::PathBuf;

pub fn cmd_query(
    database: PathBuf,
    addresses: Vec<String>,
    fields: Option<String>,
    json_output: bool,
    language: String,
) -> Result<()> {
    let fields = match fields {
        Some(list) => list
            .parse::<FieldSet>()
            .with_context(|| format!("Invalid --fields value: {}", list))?,
        None => FieldSet::all(),
    };

    let db = GeoDatabase::from(&database)
        .language(language)
        .open()
        .with_context(|| format!("Failed to load database: {}", database.display()))?;

    let mut all_found = true;
    let mut results = Vec::with_capacity(addresses.len());

    for ip in &addresses {
        match db.lookup_fields(ip, &fields) {
            Ok(record) => {
                if json_output {
                    results.push(json!({ "ip": ip, "record": record }));
                } else {
                    if addresses.len() > 1 {
                        println!("{}", ip);
                    }
                    for (field, value) in record.emit(&fields) {
                        println!("{}: {}", field.header_key(), value);
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                all_found = false;
                if json_output {
                    results.push(json!({ "ip": ip, "record": null }));
                } else {
                    eprintln!("{}: not found", ip);
                }
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Lookup failed for {}", ip));
            }
        }
    }

    if json_output {
        let output = if results.len() == 1 {
            results.remove(0)
        } else {
            json!(results)
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    // Exit with code 1 if any address had no entry
    std::process::exit(if all_found { 0 } else { 1 });
}
