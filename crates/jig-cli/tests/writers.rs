use jig_cli::dxf::{DxfLayers, write_dxf};
use jig_cli::svg::{CANVAS_HEIGHT, Canvas, PADDING, write_svg};
use jig_core::{EdgeState, Layout, PuzzleConfig, generate};

fn layout(width: usize, height: usize, seed: u64) -> Layout {
    let config = PuzzleConfig {
        seed: Some(seed),
        min_piece_size: 3,
        max_piece_size: 8,
        cut_probability: 0.5,
        ..PuzzleConfig::with_size(width, height)
    };
    generate(&config).unwrap()
}

fn to_dxf_string(layout: &Layout, layers: &DxfLayers) -> String {
    let mut buf = Vec::new();
    write_dxf(layout, layers, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

fn to_svg_string(layout: &Layout) -> String {
    let mut buf = Vec::new();
    write_svg(layout, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

/// A sink that refuses every write
struct Refusing;

impl std::io::Write for Refusing {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("disk full"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn p(code: &str, value: &str) -> (String, String) {
    (code.to_string(), value.to_string())
}

/// Group code / value pairs of a DXF document
fn pairs(dxf: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = dxf.lines().collect();
    lines
        .chunks(2)
        .map(|c| (c[0].trim().to_string(), c[1].trim().to_string()))
        .collect()
}

#[test]
fn test_dxf_structure() {
    let layout = layout(5, 4, 42);
    let dxf = to_dxf_string(&layout, &DxfLayers::default());
    let pairs = pairs(&dxf);

    assert_eq!(pairs.first().unwrap(), &p("0", "SECTION"));
    assert_eq!(pairs.last().unwrap(), &p("0", "EOF"));
    let layers: Vec<&str> = pairs
        .windows(2)
        .filter(|w| w[0] == p("0", "LAYER") && w[1].0 == "2")
        .map(|w| w[1].1.as_str())
        .collect();
    assert_eq!(layers, vec!["CUT", "INTERIOR"]);
}

#[test]
fn test_dxf_one_line_per_wall() {
    let layout = layout(6, 5, 7);
    let dxf = to_dxf_string(&layout, &DxfLayers::default());
    let pairs = pairs(&dxf);

    let lines = pairs.iter().filter(|p| p.1 == "LINE").count();
    let walls = layout
        .edges
        .iter()
        .filter(|e| e.state != EdgeState::MazeOpen)
        .count();
    assert_eq!(lines, walls);

    let on_cut = pairs.iter().filter(|p| p.0 == "8" && p.1 == "CUT").count();
    assert_eq!(on_cut, layout.cut_edges().count());
}

#[test]
fn test_dxf_custom_layers_and_flipped_y() {
    let layout = layout(1, 1, 0);
    let layers = DxfLayers {
        cut: "OUTLINE".into(),
        interior: "ETCH".into(),
    };
    let dxf = to_dxf_string(&layout, &layers);
    assert!(dxf.contains("\nOUTLINE\n"));
    assert!(dxf.contains("\nETCH\n"));

    // The north boundary of a single 10-unit cell sits at y = 10 in DXF
    let pairs = pairs(&dxf);
    let first_line = pairs.iter().position(|p| p.1 == "LINE").unwrap();
    assert_eq!(pairs[first_line + 1], p("8", "OUTLINE"));
    assert_eq!(pairs[first_line + 2], p("10", "0.000"));
    assert_eq!(pairs[first_line + 3], p("20", "10.000"));
}

#[test]
fn test_svg_canvas() {
    let layout = layout(10, 5, 3);
    let canvas = Canvas::for_layout(&layout);
    assert_eq!(canvas.height, CANVAS_HEIGHT);
    let inner = CANVAS_HEIGHT - 2.0 * PADDING;
    assert!((canvas.width - (2.0 * inner + 2.0 * PADDING)).abs() < 1e-9);
}

#[test]
fn test_svg_draws_walls_only() {
    let layout = layout(6, 6, 21);
    let svg = to_svg_string(&layout);
    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));

    let drawn = svg.matches("<line").count();
    let walls = layout.edges.iter().filter(|e| e.is_wall()).count();
    assert_eq!(drawn, walls);

    assert!(svg.contains("stroke=\"black\""));
    let interior_walls = layout.interior_edges().filter(|e| e.is_wall()).count();
    if interior_walls > 0 {
        assert!(svg.contains("stroke=\"green\""));
    }
}

#[test]
fn test_json_export() {
    let layout = layout(4, 4, 5);
    let json: serde_json::Value = serde_json::to_value(&layout).unwrap();
    assert_eq!(json["width"], 4);
    assert_eq!(json["seed"], 5);
    assert_eq!(json["edges"].as_array().unwrap().len(), layout.edges.len());
    assert_eq!(json["edges"][0]["class"], "Cut");
    assert!(json.get("grid").is_none());
}

#[test]
fn test_writer_errors_propagate() {
    let layout = layout(3, 3, 1);
    let err = write_dxf(&layout, &DxfLayers::default(), &mut Refusing).unwrap_err();
    assert_eq!(err.to_string(), "disk full");
    let err = write_svg(&layout, &mut Refusing).unwrap_err();
    assert_eq!(err.to_string(), "disk full");
}
