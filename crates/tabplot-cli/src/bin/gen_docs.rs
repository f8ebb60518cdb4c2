//! Binary that emits command-line options markdown to stdout.

fn main() {
    print!("{}", tabplot_cli::render_options_markdown());
}
