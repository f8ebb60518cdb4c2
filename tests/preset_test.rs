mod common;

use color_eyre::Result;
use tabplot::{ChartKind, ChartSettings, PresetStore};
use tempfile::TempDir;

fn customised(kind: ChartKind) -> Result<ChartSettings> {
    let mut settings = ChartSettings::default_for(kind);
    settings.apply_overrides(&["nan_method=Drop rows", "outlier_method=Cap 5%"])?;
    match kind {
        ChartKind::Histogram => settings.apply_overrides(&["col=price", "bins_val=12"])?,
        ChartKind::Scatter => settings.apply_overrides(&[
            "series_count=2",
            "series_params.1.col_choice=b.csv||y",
            "x_scale=Log10",
        ])?,
        ChartKind::Line => settings.apply_overrides(&[
            "series_count=2",
            "line_params.0.plot_ma=true",
            "line_params.1.error_mode=Column-based",
            "add_error_bars=true",
        ])?,
        ChartKind::Bar => settings.apply_overrides(&["show_vals=true", "vals_font=14"])?,
        ChartKind::Pie => settings.apply_overrides(&["angle=90"])?,
        ChartKind::Distribution => settings.apply_overrides(&["fill_val=false"])?,
        ChartKind::Boxplot => settings.apply_overrides(&["hue_col=group", "cmap_choice=viridis"])?,
        ChartKind::Violin => settings.apply_overrides(&["sensitivity=2.5"])?,
    }
    Ok(settings)
}

#[test]
fn test_round_trip_every_kind() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("presets.json");

    let mut store = PresetStore::open(&path)?;
    let mut saved = Vec::new();
    for kind in ChartKind::ALL {
        let settings = customised(kind)?;
        store.save("mine", &settings)?;
        saved.push(settings);
    }

    let reopened = PresetStore::open(&path)?;
    for (kind, settings) in ChartKind::ALL.into_iter().zip(saved) {
        assert_eq!(reopened.names(kind), vec!["mine".to_string()]);
        assert_eq!(reopened.load(kind, "mine")?, settings, "{} preset", kind);
    }
    Ok(())
}

#[test]
fn test_save_replaces_same_name() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = PresetStore::open(dir.path().join("p.json"))?;
    let mut settings = ChartSettings::default_for(ChartKind::Pie);
    store.save("p", &settings)?;
    settings.set("angle", "45")?;
    store.save("p", &settings)?;
    assert_eq!(store.names(ChartKind::Pie).len(), 1);
    assert_eq!(store.load(ChartKind::Pie, "p")?, settings);
    Ok(())
}

#[test]
fn test_delete_and_remove_all() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("p.json");
    let mut store = PresetStore::open(&path)?;
    store.save("one", &ChartSettings::default_for(ChartKind::Bar))?;
    store.save("two", &ChartSettings::default_for(ChartKind::Bar))?;

    assert!(store.delete(ChartKind::Bar, "one")?);
    assert_eq!(PresetStore::open(&path)?.names(ChartKind::Bar), vec!["two".to_string()]);

    store.remove_all()?;
    assert!(!path.exists());
    assert!(store.names(ChartKind::Bar).is_empty());
    Ok(())
}

#[test]
fn test_stored_values_merge_with_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_file(
        dir.path(),
        "p.json",
        r#"{"Histogram": {"old": {"col": "price", "bins_val": "lots", "retired_key": true}}}"#,
    );
    let store = PresetStore::open(path)?;
    let ChartSettings::Histogram(h) = store.load(ChartKind::Histogram, "old")? else {
        panic!("expected histogram settings");
    };
    assert_eq!(h.col, "price");
    assert_eq!(h.bins_val, 0);
    assert!(store.load(ChartKind::Histogram, "missing").is_err());
    Ok(())
}

#[test]
fn test_empty_name_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("p.json");
    let mut store = PresetStore::open(&path)?;
    assert!(store.save("", &ChartSettings::default_for(ChartKind::Line)).is_err());
    assert!(!path.exists());
    Ok(())
}
