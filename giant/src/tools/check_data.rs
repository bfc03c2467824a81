//! `giant check-data`: validates a benchmark's CSV and slide files without
//! invoking a provider — a dry run over the Slide Path Resolution step
//! (§6.2) a `benchmark` invocation would otherwise fail partway through.

use anyhow::Result;
use giant_eval::{load_benchmark_csv, resolve_slide_path};
use giant_slide::raster::RasterSlideReader;
use serde::Serialize;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct Subcommand {
	/// benchmark CSV listing items to validate (§6.1)
	#[arg(required = true)]
	items: PathBuf,

	/// directory containing the benchmark's slide files
	#[arg(required = true)]
	wsi_root: PathBuf,

	/// also decode each resolved slide, to catch files that resolve by name
	/// but aren't actually readable
	#[arg(long)]
	deep: bool,

	/// emit the full per-item report as JSON instead of a one-line summary
	#[arg(long)]
	json: bool,
}

#[derive(Serialize)]
struct ItemReport {
	item_id: String,
	resolved_path: Option<PathBuf>,
	error: Option<String>,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let items = load_benchmark_csv(&arguments.items)?;
	let mut reports = Vec::with_capacity(items.len());

	for item in &items {
		let report = match resolve_slide_path(&arguments.wsi_root, item) {
			Ok(path) => {
				let error = if arguments.deep { RasterSlideReader::open(&path).err().map(|err| format!("{err:#}")) } else { None };
				ItemReport { item_id: item.id.clone(), resolved_path: Some(path), error }
			}
			Err(err) => ItemReport { item_id: item.id.clone(), resolved_path: None, error: Some(err.to_string()) },
		};
		reports.push(report);
	}

	let failures = reports.iter().filter(|report| report.error.is_some()).count();

	if arguments.json {
		serde_json::to_writer_pretty(std::io::stdout(), &reports)?;
		println!();
	} else {
		println!("checked {} item(s), {} failure(s)", reports.len(), failures);
		for report in reports.iter().filter(|report| report.error.is_some()) {
			println!("  {}: {}", report.item_id, report.error.as_deref().unwrap_or("unknown error"));
		}
	}

	anyhow::ensure!(failures == 0, "{failures} item(s) failed validation");
	Ok(())
}
