use crate::border::compute_borders;
use crate::config::{Config, load_config};
use crate::csv_io::{export_csv, import_csv};
use crate::model::Orientation;
use crate::packing::pack;
use crate::plan::PlatePlan;
use crate::plate::Plate;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "plated", version, about = "96-well plate layout designer (packing + rendering)")]
pub struct Args {
    /// Plate plan (.json5), previously exported layout (.csv), or '-' for a plan on stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file or directory; multi-plate runs are numbered. Defaults to stdout for SVG/CSV.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (grid geometry, ladder, theme, palette)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Run replicates along rows instead of columns
    #[arg(long = "horizontal")]
    pub horizontal: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    Csv,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Csv => "csv",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let orientation = if args.horizontal {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    };

    let (input, is_layout) = read_input(args.input.as_deref())?;

    if is_layout {
        let imported = import_csv(input.as_bytes(), &config.grid)?;
        write_plate(
            &imported.plate,
            &imported.names,
            &config,
            args.output_format,
            args.output.as_deref(),
        )?;
        return Ok(());
    }

    let plan = PlatePlan::parse(&input)?;
    let (queue, names) = plan.to_queue();
    let plates = pack(queue, &config.grid, orientation)?;

    if plates.len() == 1 {
        write_plate(
            &plates[0],
            &names,
            &config,
            args.output_format,
            args.output.as_deref(),
        )?;
        return Ok(());
    }

    // Overflow run: one output per plate.
    let outputs = resolve_multi_outputs(args.output.as_deref(), args.output_format, plates.len())?;
    for (plate, output) in plates.iter().zip(&outputs) {
        write_plate(plate, &names, &config, args.output_format, Some(output.as_path()))?;
    }

    Ok(())
}

fn write_plate(
    plate: &Plate,
    names: &BTreeMap<(u32, u32), String>,
    config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    match format {
        OutputFormat::Csv => match output {
            Some(path) => {
                let file = std::fs::File::create(path)?;
                export_csv(plate, names, file)?;
            }
            None => {
                export_csv(plate, names, io::stdout().lock())?;
            }
        },
        OutputFormat::Svg => {
            let overlay = compute_borders(plate);
            let svg = render_svg(plate, &overlay, names, &config.theme, &config.render);
            write_output_svg(&svg, output)?;
        }
        OutputFormat::Png => {
            let output = output
                .ok_or_else(|| anyhow::anyhow!("Output path required for png output"))?;
            let overlay = compute_borders(plate);
            let svg = render_svg(plate, &overlay, names, &config.theme, &config.render);
            write_png(&svg, output, config)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!(
        "png output requires the 'png' feature; rebuild with --features png"
    ))
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)?;
        let is_layout = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        return Ok((content, is_layout));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base =
        output.ok_or_else(|| anyhow::anyhow!("Output path required for a multi-plate run"))?;
    if base.is_dir() {
        let mut outputs = Vec::new();
        for idx in 0..count {
            outputs.push(base.join(format!("plate-{}.{}", idx + 1, ext)));
        }
        return Ok(outputs);
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("plate");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    let mut outputs = Vec::new();
    for idx in 0..count {
        outputs.push(parent.join(format!("{}-{}.{}", stem, idx + 1, ext)));
    }
    Ok(outputs)
}
