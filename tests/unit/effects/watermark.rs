use super::*;

fn grid_cfg() -> WatermarkConfig {
    WatermarkConfig {
        mode: WatermarkMode::Grid,
        ..WatermarkConfig::default()
    }
}

#[test]
fn grid_cells_are_centered_in_their_cells() {
    let layout = GridLayout::compute(&grid_cfg(), (720, 1280), (400, 200)).unwrap();
    assert_eq!((layout.mark_width, layout.mark_height), (208, 104));
    assert_eq!(layout.cells.len(), 18);
    assert_eq!((layout.cells[0].x, layout.cells[0].y), (16, 55));
    let last = layout.cells[17];
    assert_eq!((last.col, last.row), (2, 5));
    assert_eq!((last.x, last.y), (496, 1121));
    for c in &layout.cells {
        assert!(c.x >= 0 && c.y >= 0);
        assert!(c.x + layout.mark_width as i32 <= 720);
        assert!(c.y + layout.mark_height as i32 <= 1280);
    }
}

#[test]
fn grid_graph_preserves_frame_size_and_duration() {
    let wm = FullFrameWatermark::new("wm.png", grid_cfg());
    let graph = wm.graph((720, 1280), (400, 200)).unwrap();
    graph.validate().unwrap();
    assert_eq!(graph.terminal_outputs(), vec![Pad::new("v")]);

    // The main video only ever passes through overlays, each bounded by the main stream.
    for chain in &graph.chains {
        if chain.inputs.iter().any(|p| p.label() != "1:v" && !p.label().starts_with('w')) {
            assert!(chain.filters.iter().all(|f| f.name() == "overlay"));
            assert!(chain.filters.iter().all(|f| f.get("shortest") == Some("1")));
        }
    }
    let overlays = graph.filters().filter(|f| f.name() == "overlay").count();
    assert_eq!(overlays, 18);
    let split = graph.filters().find(|f| f.name() == "split").unwrap();
    assert_eq!(split.to_string(), "split=18");

    let cmd = wm
        .command(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            (720, 1280),
            (400, 200),
            &EncodeProfile::default(),
        )
        .unwrap();
    assert!(!cmd.has_arg("-t"));
    assert!(!cmd.has_arg("-s"));
    assert!(cmd.has_arg("0:a?"));
}

#[test]
fn single_mark_is_scaled_faded_and_centered() {
    let wm = FullFrameWatermark::new("wm.png", WatermarkConfig::default());
    let g = wm.graph((720, 1280), (400, 200)).unwrap();
    assert_eq!(
        g.to_string(),
        "[1:v]format=rgba,colorchannelmixer=aa=0.25,scale=648:324[wm];\
         [0:v][wm]overlay=x=(W-w)/2:y=(H-h)/2:shortest=1:format=auto[v]"
    );
}

#[test]
fn single_mark_scale_is_clamped_and_rotation_adds_rotate() {
    let cfg = WatermarkConfig {
        scale: 3.0,
        rotate_deg: 30.0,
        ..WatermarkConfig::default()
    };
    let g = FullFrameWatermark::new("wm.png", cfg)
        .graph((720, 1280), (400, 200))
        .unwrap();
    let scale = g.filters().find(|f| f.name() == "scale").unwrap();
    assert_eq!(scale.to_string(), "scale=1080:540");
    let rotate = g.filters().find(|f| f.name() == "rotate").unwrap();
    assert_eq!(rotate.get("c"), Some("none"));
    assert_eq!(rotate.get("a"), Some("0.524"));
}

#[test]
fn invalid_alpha_is_rejected() {
    let cfg = WatermarkConfig {
        alpha: 1.5,
        ..WatermarkConfig::default()
    };
    assert!(FullFrameWatermark::new("wm.png", cfg)
        .graph((720, 1280), (10, 10))
        .is_err());
}

#[test]
fn mode_parses_case_insensitively() {
    assert_eq!("GRID".parse::<WatermarkMode>().unwrap(), WatermarkMode::Grid);
    assert_eq!(" single ".parse::<WatermarkMode>().unwrap(), WatermarkMode::Single);
    assert!("tiles".parse::<WatermarkMode>().is_err());
}

#[test]
fn corner_graph_pins_top_right() {
    let corner = CornerWatermark::default();
    assert_eq!(
        corner.graph().to_string(),
        "[1:v]scale=120:-1[wm];[0:v][wm]overlay=W-w-24:24[v]"
    );
}

#[test]
fn corner_safe_top_uses_scaled_mark_height() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wm.png");
    image::RgbaImage::new(240, 60).save(&path).unwrap();
    let corner = CornerWatermark {
        path,
        ..CornerWatermark::default()
    };
    assert_eq!(corner.scaled_height(), Some(30));
    assert_eq!(corner.safe_top_px(), 24 + 30 + 12);

    let missing = CornerWatermark {
        path: dir.path().join("missing.png"),
        ..CornerWatermark::default()
    };
    assert_eq!(missing.safe_top_px(), 160);
}
