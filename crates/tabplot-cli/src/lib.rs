//! Shared CLI definitions for tabplot.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// File format for input tables (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Spreadsheet workbook (.xls, .xlsx, .xlsm, .xlsb, .ods); only the first sheet is read
    Excel,
}

impl FileFormat {
    /// Detect file format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "xlsx").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// Chart kind selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ChartArg {
    Histogram,
    Scatter,
    Line,
    Bar,
    Pie,
    Distribution,
    Boxplot,
    /// Violin plot
    Violin,
}

/// Command-line arguments for tabplot
#[derive(Clone, Parser, Debug)]
#[command(
    name = "tabplot",
    version,
    about = "Statistical charts from tabular files with reusable presets",
    long_about = "Load one or more CSV or spreadsheet files, clean the selected columns \
(missing values, outliers, axis scales) and render one chart to a PNG image.\n\n\
Columns from a specific file are addressed as \"<file>||<column>\"; a bare column \
name refers to the first file. Chart settings come from a named preset and/or \
--set KEY=VALUE overrides (values are JSON, or plain text)."
)]
pub struct Args {
    /// Path(s) to the data file(s) to load. Each file becomes one table named after the file
    #[arg(
        required_unless_present_any = ["generate_config", "list_presets", "remove_presets", "delete_preset"],
        num_args = 1..,
        value_name = "PATH"
    )]
    pub paths: Vec<PathBuf>,

    /// Chart kind to configure and render
    #[arg(short = 'c', long = "chart", value_enum, default_value = "histogram")]
    pub chart: ChartArg,

    /// Start from a saved preset for the chart kind
    #[arg(short = 'p', long = "preset", value_name = "NAME")]
    pub preset: Option<String>,

    /// Override a chart setting, e.g. --set col=price --set bins_val=20 --set 'line_params=[...]'
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// First row of the window (0-based, inclusive). Default: 0
    #[arg(long = "row-start", value_name = "N")]
    pub row_start: Option<usize>,

    /// End of the row window (exclusive). Default: number of rows in the first table
    #[arg(long = "row-end", value_name = "N")]
    pub row_end: Option<usize>,

    /// Output image path (PNG)
    #[arg(short = 'o', long = "output", value_name = "FILE", default_value = "chart.png")]
    pub output: PathBuf,

    /// Chart title. Blank uses the chart's default title
    #[arg(long = "title")]
    pub title: Option<String>,

    /// X axis label. Blank uses the chart's default label
    #[arg(long = "xlabel")]
    pub xlabel: Option<String>,

    /// Y axis label. Blank uses the chart's default label
    #[arg(long = "ylabel")]
    pub ylabel: Option<String>,

    /// Figure width in inches (1-20). Overrides config [figure] width
    #[arg(long = "width", value_name = "INCHES")]
    pub width: Option<f64>,

    /// Figure height in inches (1-20). Overrides config [figure] height
    #[arg(long = "height", value_name = "INCHES")]
    pub height: Option<f64>,

    /// Pixels per inch of the rendered image. Overrides config [figure] dpi
    #[arg(long = "dpi", value_name = "N")]
    pub dpi: Option<u32>,

    /// Title font size in points
    #[arg(long = "title-size", value_name = "PT")]
    pub title_size: Option<u32>,

    /// Axis label font size in points
    #[arg(long = "label-size", value_name = "PT")]
    pub label_size: Option<u32>,

    /// Tick label font size in points
    #[arg(long = "tick-size", value_name = "PT")]
    pub tick_size: Option<u32>,

    /// Legend font size in points
    #[arg(long = "legend-size", value_name = "PT")]
    pub legend_size: Option<u32>,

    /// Force input file format (csv, tsv, excel) instead of detecting it from the extension
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Save the resolved chart settings as a preset with this name
    #[arg(long = "save-preset", value_name = "NAME")]
    pub save_preset: Option<String>,

    /// Delete the named preset of the selected chart kind and exit
    #[arg(long = "delete-preset", value_name = "NAME")]
    pub delete_preset: Option<String>,

    /// List saved presets of the selected chart kind and exit
    #[arg(long = "list-presets", action)]
    pub list_presets: bool,

    /// Remove all saved presets and exit
    #[arg(long = "remove-presets", action)]
    pub remove_presets: bool,

    /// Preset file to use instead of the configured one
    #[arg(long = "presets-file", value_name = "FILE")]
    pub presets_file: Option<PathBuf>,

    /// Render and report warnings without writing an output file
    #[arg(long = "check", action)]
    pub check: bool,

    /// Generate default configuration file at ~/.config/tabplot/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,

    /// Log pipeline details to stderr (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn value_placeholder(arg: &clap::Arg) -> String {
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let option_str = if arg.is_positional() {
            let placeholder = value_placeholder(arg);
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_placeholder(arg)
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("data.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("data.TSV")),
            Some(FileFormat::Tsv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("book.xlsx")),
            Some(FileFormat::Excel)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("sheet.ods")),
            Some(FileFormat::Excel)
        );
        assert_eq!(FileFormat::from_path(Path::new("data.parquet")), None);
        assert_eq!(FileFormat::from_path(Path::new("data")), None);
    }

    #[test]
    fn test_args_parse_overrides() {
        let args = Args::try_parse_from([
            "tabplot",
            "a.csv",
            "b.csv",
            "--chart",
            "line",
            "--set",
            "series_count=2",
            "--set",
            "show_grid=true",
            "--row-end",
            "10",
        ])
        .unwrap();
        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.chart, ChartArg::Line);
        assert_eq!(args.set, vec!["series_count=2", "show_grid=true"]);
        assert_eq!(args.row_end, Some(10));
        assert_eq!(args.output, PathBuf::from("chart.png"));
    }

    #[test]
    fn test_paths_not_required_for_preset_maintenance() {
        assert!(Args::try_parse_from(["tabplot", "--list-presets"]).is_ok());
        assert!(Args::try_parse_from(["tabplot", "--generate-config"]).is_ok());
        assert!(Args::try_parse_from(["tabplot"]).is_err());
    }

    #[test]
    fn test_force_requires_generate_config() {
        assert!(Args::try_parse_from(["tabplot", "a.csv", "--force"]).is_err());
    }

    #[test]
    fn test_render_options_markdown_lists_chart_flag() {
        let md = render_options_markdown();
        assert!(md.contains("--chart"));
        assert!(md.contains("--save-preset"));
    }

    #[test]
    fn test_check_help_describes_a_render_without_output() {
        let cmd = Args::command();
        let check = cmd
            .get_arguments()
            .find(|a| a.get_id() == "check")
            .unwrap();
        let help = check.get_help().unwrap().to_string();
        assert!(help.contains("without writing an output file"));
        assert!(!help.contains("do not render"));
    }
}
