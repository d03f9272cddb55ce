//! Tests for running complete run files through the regrid service.

use std::fs;
use std::path::Path;

use radar_regrid::{PolarScan, ScanGeometry};
use regrid::{execute, load_run_config};
use test_utils::{create_rain_cell_values, fixtures::site, list_files, temp_cache_dir};

fn write_scan(dir: &Path, file: &str, name: &str, position: (f64, f64)) {
    let geometry = ScanGeometry {
        azimuth_start: 0.5,
        azimuth_step: 2.0,
        range_start: 250.0,
        range_step: 250.0,
        elevation: 1.5,
        n_azimuth: 180,
        n_range: 40,
    };
    let scan = PolarScan::new(name, position, geometry, create_rain_cell_values(180, 40, 50.0));
    fs::create_dir_all(dir.join("scans")).unwrap();
    fs::write(dir.join("scans").join(file), serde_json::to_string(&scan).unwrap()).unwrap();
}

const RUN_YAML: &str = r#"
grid:
  lon_start: -0.1
  lon_end: 0.1
  lat_start: -0.1
  lat_end: 0.1
  res_m: 500.0
  res_deg: 0.0045
  center: [0.0, 0.0]
  max_range: 10000.0
regrid:
  azimuth_factor: 2
  cache_dir: ${REGRID_RUN_FILE_TEST_UNSET:-cache}
  memory_cache_entries: 0
  pole: { kind: centered_on, lon: 9.9734, lat: 53.5566 }
radars:
  - file: scans/pattern.json
  - file: scans/boo.json
    azimuth_factor: 3
floor: 5.0
output: out/field.json
"#;

fn setup() -> tempfile::TempDir {
    let dir = temp_cache_dir();
    write_scan(dir.path(), "pattern.json", "PATTERN", site::HAMBURG);
    write_scan(
        dir.path(),
        "boo.json",
        "boo",
        (site::HAMBURG.0 + 0.03, site::HAMBURG.1 + 0.01),
    );
    fs::write(dir.path().join("run.yaml"), RUN_YAML).unwrap();
    dir
}

// ============================================================================
// Run file execution
// ============================================================================

#[test]
fn test_run_file_produces_two_fields_and_difference() {
    let dir = setup();
    let run = load_run_config(dir.path().join("run.yaml")).unwrap();
    let regrid_config = run.regrid.clone().unwrap();

    let doc = execute(&run, &regrid_config).unwrap();

    assert_eq!(doc.fields.len(), 2);
    assert_eq!(doc.grid.cell_dims(), (45, 45));
    assert_eq!(doc.lon_axis.len(), 45);
    assert!(doc.difference.is_some());
    assert!(doc.fields[0].signature.contains("_k2_"));
    assert!(doc.fields[1].signature.contains("_k3_"));
}

#[test]
fn test_second_run_reuses_cached_matrices() {
    let dir = setup();
    let run = load_run_config(dir.path().join("run.yaml")).unwrap();
    let regrid_config = run.regrid.clone().unwrap();

    let first = execute(&run, &regrid_config).unwrap();
    let second = execute(&run, &regrid_config).unwrap();

    assert!(first.fields.iter().all(|f| f.cache == "miss"));
    assert!(second.fields.iter().all(|f| f.cache == "hit"));
    assert_eq!(list_files(&dir.path().join("cache")).len(), 2);

    for (a, b) in first.fields.iter().zip(&second.fields) {
        assert!(a.field.bit_eq(&b.field));
    }
}

#[test]
fn test_document_written_next_to_run_file() {
    let dir = setup();
    let run = load_run_config(dir.path().join("run.yaml")).unwrap();
    let regrid_config = run.regrid.clone().unwrap().without_cache();

    let doc = execute(&run, &regrid_config).unwrap();
    doc.write(run.output.as_deref()).unwrap();

    let path = dir.path().join("out").join("field.json");
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(value["fields"][0]["radar"], "PATTERN");
    assert_eq!(value["fields"][1]["radar"], "boo");
    assert_eq!(value["grid"]["lat_dim"], 45);
    assert!(value["difference"]["data"].is_array());
}
