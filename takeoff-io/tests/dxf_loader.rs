use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

use takeoff_core::document::Entity;
use takeoff_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_floor_plan_header_and_layers() {
    let loader = DxfFacade::new();
    let doc = loader.load(&fixture("floor_plan.dxf")).expect("读取 DXF 失败");

    assert_eq!(doc.units(), Some(2));
    let layers: Vec<&str> = doc.layers().collect();
    assert_eq!(layers, vec!["0", "ROOMS", "Brick-Walls", "Concrete Slab"]);
    assert_eq!(doc.entity_count(), 11);

    let kinds: Vec<&str> = doc.entities().map(|(_, entity)| entity.type_name()).collect();
    assert_eq!(
        kinds,
        vec![
            "LWPOLYLINE",
            "LWPOLYLINE",
            "LWPOLYLINE",
            "TEXT",
            "MTEXT",
            "INSERT",
            "DIMENSION",
            "HATCH",
            "LEADER",
            "CIRCLE",
            "LINE",
        ]
    );
}

#[test]
fn load_floor_plan_labels() {
    let loader = DxfFacade::new();
    let doc = loader.load(&fixture("floor_plan.dxf")).expect("读取 DXF 失败");

    let mut found_text = false;
    let mut found_mtext = false;
    let mut found_insert = false;
    for (_, entity) in doc.entities() {
        match entity {
            Entity::Text(text) => {
                found_text = true;
                assert_eq!(text.content, "  LIVING  ");
                assert_eq!(text.handle, "1A");
                assert_eq!(text.layer, "ROOMS");
                assert!((text.insert.x() - 60.0).abs() < 1e-9);
            }
            Entity::MText(mtext) => {
                found_mtext = true;
                assert_eq!(mtext.content, "BED\nROOM");
            }
            Entity::BlockReference(reference) => {
                found_insert = true;
                assert_eq!(reference.name, "ROOMTAG");
                assert_eq!(reference.attributes.len(), 2);
                assert_eq!(reference.attributes[0].tag, "NAME");
                assert_eq!(reference.attributes[0].text, "STUDY");
                assert_eq!(reference.attributes[1].tag, "NUMBER");
                assert!((reference.insert.y() - 100.0).abs() < 1e-9);
            }
            Entity::Dimension(dimension) => {
                assert_eq!(dimension.text, "10'-0\"");
                assert!((dimension.definition_point.y() + 10.0).abs() < 1e-9);
            }
            Entity::Hatch(hatch) => {
                assert_eq!(hatch.handle, "2F");
                assert_eq!(hatch.pattern_name, "SOLID");
                assert!(hatch.is_solid);
            }
            Entity::Leader(leader) => {
                assert_eq!(leader.vertices.len(), 2);
                assert!((leader.vertices[0].x() - 250.0).abs() < 1e-9);
            }
            Entity::Circle(circle) => {
                assert!((circle.radius - 12.0).abs() < 1e-9);
                assert_eq!(circle.layer, "Concrete Slab");
            }
            Entity::Polyline(_) => {}
            Entity::Other(other) => {
                assert_eq!(other.kind, "LINE");
                assert_eq!(other.layer, "Brick-Walls");
                // 缺少组码 5 时由文档补齐句柄
                assert_eq!(other.handle, "~11");
            }
        }
    }
    assert!(found_text && found_mtext && found_insert, "文字类实体缺失");
}

#[test]
fn load_floor_plan_polylines() {
    let loader = DxfFacade::new();
    let doc = loader.load(&fixture("floor_plan.dxf")).expect("读取 DXF 失败");

    let polylines: Vec<_> = doc
        .entities()
        .filter_map(|(_, entity)| match entity {
            Entity::Polyline(polyline) => Some(polyline),
            _ => None,
        })
        .collect();
    assert_eq!(polylines.len(), 3);
    assert!(polylines[0].is_closed);
    assert_eq!(polylines[0].vertices.len(), 4);
    assert!((polylines[0].area().expect("closed") - 14_400.0).abs() < 1e-9);
    assert!(!polylines[2].is_closed);
    assert!(polylines[2].area().is_none());
}

#[test]
fn load_polyline_with_bulge_preserves_value() {
    let loader = DxfFacade::new();
    let doc = loader
        .load(&fixture("bulge_disc.dxf"))
        .expect("读取带 bulge 的 DXF 失败");
    assert_eq!(doc.units(), None);

    let mut polylines = doc.entities().filter_map(|(_, entity)| match entity {
        Entity::Polyline(polyline) => Some(polyline),
        _ => None,
    });
    let polyline = polylines.next().expect("未找到多段线实体");
    assert!(polylines.next().is_none(), "期望仅有一个多段线实体");
    assert_eq!(polyline.vertices.len(), 2);
    assert!((polyline.vertices[0].bulge - 1.0).abs() < 1e-9);
    assert!((polyline.area().expect("closed") - 25.0 * PI).abs() < 1e-9);
}

#[test]
fn binary_dxf_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("binary.dxf");
    fs::write(&path, b"AutoCAD Binary DXF\r\n\x1a\x00").expect("seed");

    let err = DxfFacade::new().load(&path).expect_err("binary must fail");
    assert!(matches!(err, IoError::UnsupportedFeature(_)), "{err}");
}

#[test]
fn truncated_entity_is_invalid() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.dxf");
    fs::write(&path, "0\nSECTION\n2\nENTITIES\n0\nCIRCLE\n8\n0\n10\n").expect("seed");

    let err = DxfFacade::new().load(&path).expect_err("truncated file");
    assert!(matches!(err, IoError::InvalidDocument(_)), "{err}");
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = DxfFacade::new()
        .load(&dir.path().join("absent.dxf"))
        .expect_err("file is absent");
    assert!(matches!(err, IoError::ReadError { .. }));
}
