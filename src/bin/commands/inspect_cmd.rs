use anyhow::{Context, Result};
use geodb::{DatabaseInfo, GeoDatabase};
use serde_json::json;
use std::path::{Path, PathBuf};

pub fn cmd_inspect(database: PathBuf, json_output: bool) -> Result<()> {
    let db = GeoDatabase::open(&database)
        .with_context(|| format!("Failed to load database: {}", database.display()))?;
    let info = db.info()?;

    if json_output {
        let output = json!({
            "file": database.display().to_string(),
            "info": info,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&database, &info);
    }

    Ok(())
}

fn print_summary(database: &Path, info: &DatabaseInfo) {
    println!("Database: {}", database.display());
    println!("Format:   {}", info.format);
    println!("Type:     {}", info.database_type);
    println!("Size:     {} bytes", info.size);

    if let Some(epoch) = info.build_epoch {
        println!("Built:    {}", format_unix_timestamp(epoch));
    }
    if let Some((year, month, day)) = info.build_date {
        println!("Built:    {:04}-{:02}-{:02}", year, month, day);
    }

    println!();
    println!("Layout:");
    if let Some(version) = info.ip_version {
        println!("  IP version:      {}", version);
    }
    if let Some(nodes) = info.node_count {
        println!("  Tree nodes:      {}", nodes);
    }
    if let Some(bits) = info.record_size {
        println!("  Record size:     {} bits", bits);
    }
    if let Some(rows) = info.ipv4_rows {
        println!("  IPv4 ranges:     {}", rows);
    }
    if let Some(rows) = info.ipv6_rows {
        println!("  IPv6 ranges:     {}", rows);
    }

    if !info.languages.is_empty() {
        println!();
        println!("Languages: {}", info.languages.join(", "));
    }

    println!();
    println!("Fields ({}):", info.fields.len());
    for field in info.fields.iter() {
        println!("  {}", field.header_key());
    }
}

fn format_unix_timestamp(timestamp: u64) -> String {
    let days = timestamp / 86400;
    let secs = timestamp % 86400;
    let (year, month, day) = civil_from_days(days as i64);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        year,
        month,
        day,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

// Days since 1970-01-01 to a proleptic Gregorian date
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
