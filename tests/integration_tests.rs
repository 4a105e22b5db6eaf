// End-to-end tests through the public GeoDatabase API

mod common;

use common::{city_record, write_temp, BinFixture, Cell, MmdbFixture};
use geodb::{DatabaseFormat, DatabaseOptions, FieldSet, GeoDatabase, GeoError, GeoField};
use std::sync::Arc;
use std::thread;

fn country_only_bin() -> Vec<u8> {
    BinFixture::new(1, 2)
        .v4_row("0.0.0.0", vec![Cell::Country("US", "United States")])
        .build()
}

#[test]
fn test_open_missing_file() {
    let err = GeoDatabase::open("/nonexistent/path").unwrap_err();
    assert_eq!(err, GeoError::FileNotFound("/nonexistent/path".to_string()));
}

#[test]
fn test_truncated_mmdb_has_no_metadata() {
    let full = MmdbFixture::new(4, 24)
        .insert("1.0.0.0", 8, city_record("AU", "Australia", "Sydney", -33.5, 151.25))
        .build();
    // Cut the file before the metadata marker
    let truncated = &full[..full.len() / 3];
    let (_dir, path) = write_temp("truncated.mmdb", truncated);

    assert_eq!(
        GeoDatabase::open(&path).unwrap_err(),
        GeoError::MetadataNotFound
    );
}

#[test]
fn test_empty_file_is_rejected() {
    let (_dir, path) = write_temp("empty.bin", &[]);
    assert!(matches!(
        GeoDatabase::open(&path),
        Err(GeoError::InvalidHeader(_))
    ));
}

#[test]
fn test_country_only_end_to_end() {
    let (_dir, path) = write_temp("country.bin", &country_only_bin());
    let db = GeoDatabase::open(&path).unwrap();
    assert_eq!(db.format(), DatabaseFormat::Ip2Location);

    let record = db.lookup("8.8.8.8").unwrap();
    assert_eq!(record.country_code.as_deref(), Some("US"));
    assert_eq!(
        record.emit(&FieldSet::empty().with(GeoField::CountryCode)),
        vec![(GeoField::CountryCode, "US".to_string())]
    );

    assert_eq!(
        db.lookup("not-an-ip").unwrap_err(),
        GeoError::InvalidAddress("not-an-ip".to_string())
    );
    // Disabled columns are simply absent
    assert_eq!(record.city, None);
    assert_eq!(record.value(GeoField::Latitude), None);
}

#[test]
fn test_mmdb_end_to_end() {
    let image = MmdbFixture::new(4, 24)
        .insert(
            "0.0.0.0",
            1,
            common::map(vec![(
                "country",
                common::map(vec![("iso_code", common::text("US"))]),
            )]),
        )
        .build();
    let (_dir, path) = write_temp("country.mmdb", &image);
    let db = GeoDatabase::open(&path).unwrap();
    assert_eq!(db.format(), DatabaseFormat::Mmdb);

    let record = db.lookup("8.8.8.8").unwrap();
    assert_eq!(record.country_code.as_deref(), Some("US"));
    assert_eq!(record.country_name, None);

    // 128.0.0.0/1 has no data
    assert!(db.lookup("192.0.2.1").unwrap_err().is_not_found());
}

#[test]
fn test_repeated_lookups_are_identical() {
    let image = MmdbFixture::new(6, 28)
        .insert("8.8.8.0", 24, city_record("US", "United States", "Chicago", 41.875, -87.625))
        .build();
    let db = GeoDatabase::from_bytes(image, DatabaseFormat::Mmdb).unwrap();

    let first = db.lookup("8.8.8.8").unwrap();
    for _ in 0..10 {
        assert_eq!(db.lookup("8.8.8.8").unwrap(), first);
    }
}

#[test]
fn test_in_memory_matches_mmap() {
    let image = MmdbFixture::new(4, 32)
        .insert("10.0.0.0", 8, city_record("US", "United States", "Chicago", 41.875, -87.625))
        .insert("10.1.0.0", 16, city_record("CA", "Canada", "Toronto", 43.75, -79.5))
        .build();
    let (_dir, path) = write_temp("geo.mmdb", &image);

    let mapped = GeoDatabase::open(&path).unwrap();
    let owned = GeoDatabase::from(&path).in_memory().open().unwrap();

    for ip in ["10.0.0.1", "10.1.2.3", "10.255.0.1"] {
        assert_eq!(mapped.lookup(ip).unwrap(), owned.lookup(ip).unwrap(), "{}", ip);
    }
    assert_eq!(owned.lookup("10.1.2.3").unwrap().city.as_deref(), Some("Toronto"));
}

#[test]
fn test_format_detection_without_extension() {
    let (_dir, bin_path) = write_temp("geo.dat", &country_only_bin());
    let db = GeoDatabase::open(&bin_path).unwrap();
    assert_eq!(db.format(), DatabaseFormat::Ip2Location);

    let image = MmdbFixture::new(4, 24)
        .insert("0.0.0.0", 1, city_record("US", "United States", "Chicago", 41.875, -87.625))
        .build();
    let (_dir2, mmdb_path) = write_temp("geo.dat", &image);
    let db = GeoDatabase::open(&mmdb_path).unwrap();
    assert_eq!(db.format(), DatabaseFormat::Mmdb);
}

#[test]
fn test_forced_format_overrides_extension() {
    let (_dir, path) = write_temp("misnamed.mmdb", &country_only_bin());
    assert_eq!(
        GeoDatabase::open(&path).unwrap_err(),
        GeoError::MetadataNotFound
    );

    let db = GeoDatabase::from(&path)
        .format(DatabaseFormat::Ip2Location)
        .open()
        .unwrap();
    assert_eq!(db.lookup("1.2.3.4").unwrap().country_code.as_deref(), Some("US"));
}

#[test]
fn test_open_with_options() {
    let (_dir, path) = write_temp("country.bin", &country_only_bin());
    let options = DatabaseOptions {
        path: path.clone(),
        in_memory: true,
        ..Default::default()
    };
    let db = GeoDatabase::open_with_options(options).unwrap();
    assert_eq!(db.lookup("4.4.4.4").unwrap().country_name.as_deref(), Some("United States"));
}

#[test]
fn test_close_releases_handle() {
    let (_dir, path) = write_temp("country.bin", &country_only_bin());
    let mut db = GeoDatabase::open(&path).unwrap();
    assert!(db.lookup("8.8.8.8").is_ok());

    db.close();
    assert!(db.is_closed());
    assert_eq!(db.lookup("8.8.8.8").unwrap_err(), GeoError::Closed);
    // The file can be removed once the mapping is gone
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_field_selection() {
    let image = BinFixture::new(11, 8)
        .v4_row(
            "0.0.0.0",
            vec![
                Cell::Country("US", "United States"),
                Cell::Text("California"),
                Cell::Text("Mountain View"),
                Cell::Float(37.5),
                Cell::Float(-122.25),
                Cell::Text("94043"),
                Cell::Text("-07:00"),
            ],
        )
        .build();
    let db = GeoDatabase::from_bytes(image, DatabaseFormat::Ip2Location).unwrap();

    let wanted: FieldSet = "city,latitude,timezone".parse().unwrap();
    let record = db.lookup_fields("8.8.8.8", &wanted).unwrap();
    assert_eq!(record.country_code, None);
    assert_eq!(record.region, None);
    assert_eq!(
        record.emit(&wanted),
        vec![
            (GeoField::City, "Mountain View".to_string()),
            (GeoField::Latitude, "37.500000".to_string()),
            (GeoField::TimeZone, "-07:00".to_string()),
        ]
    );

    let full = db.lookup("8.8.8.8").unwrap();
    assert_eq!(full.postal_code.as_deref(), Some("94043"));
    assert_eq!(full.value(GeoField::Longitude).as_deref(), Some("-122.250000"));
}

#[test]
fn test_shared_across_threads() {
    let image = MmdbFixture::new(6, 24)
        .insert("1.0.0.0", 8, city_record("AU", "Australia", "Sydney", -33.5, 151.25))
        .insert("2.0.0.0", 8, city_record("FR", "France", "Paris", 48.75, 2.25))
        .insert("2001:db8::", 32, city_record("DE", "Germany", "Berlin", 52.5, 13.25))
        .build();
    let db = Arc::new(GeoDatabase::from_bytes(image, DatabaseFormat::Mmdb).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for _ in 0..100 {
                    let (ip, expected) = match i % 3 {
                        0 => ("1.2.3.4", "AU"),
                        1 => ("2.3.4.5", "FR"),
                        _ => ("2001:db8::1", "DE"),
                    };
                    let record = db.lookup(ip).unwrap();
                    assert_eq!(record.country_code.as_deref(), Some(expected));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_info_reports_layout() {
    let image = MmdbFixture::new(6, 28)
        .database_type("GeoLite2-City")
        .languages(&["en", "de"])
        .insert("1.0.0.0", 8, city_record("AU", "Australia", "Sydney", -33.5, 151.25))
        .build();
    let size = image.len();
    let db = GeoDatabase::from_bytes(image, DatabaseFormat::Mmdb).unwrap();
    let info = db.info().unwrap();

    assert_eq!(info.database_type, "GeoLite2-City");
    assert_eq!(info.languages, vec!["en", "de"]);
    assert_eq!(info.ip_version, Some(6));
    assert_eq!(info.record_size, Some(28));
    assert_eq!(info.build_epoch, Some(1_700_000_000));
    assert_eq!(info.size, size);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["format"], "mmdb");
    assert!(json.get("ipv4_rows").is_none());
}
