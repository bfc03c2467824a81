//! `giant visualize`: renders one persisted `RunResult`'s trajectory as a
//! static, dependency-free HTML page (§6.4: no interactivity, no GUI
//! framework — this is the interface surface, not a rendering subsystem).

use anyhow::{Context, Result};
use giant_core::model::{Action, MessageContent, RunResult};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct Subcommand {
	/// a `RunResult` JSON file, as written by `giant run`/`giant benchmark`
	#[arg(required = true)]
	trajectory: PathBuf,

	/// where to write the rendered HTML page
	#[arg(long, default_value = "trajectory.html")]
	output: PathBuf,

	#[arg(long)]
	json: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let contents = std::fs::read_to_string(&arguments.trajectory).with_context(|| format!("reading {}", arguments.trajectory.display()))?;
	let result: RunResult = serde_json::from_str(&contents).with_context(|| format!("parsing {} as a RunResult", arguments.trajectory.display()))?;

	let html = render_html(&result);
	std::fs::write(&arguments.output, &html).with_context(|| format!("writing {}", arguments.output.display()))?;

	if arguments.json {
		serde_json::to_writer_pretty(std::io::stdout(), &serde_json::json!({ "output": arguments.output }))?;
		println!();
	} else {
		println!("wrote {}", arguments.output.display());
	}
	Ok(())
}

fn render_html(result: &RunResult) -> String {
	let mut out = String::new();
	out.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>GIANT trajectory</title>\n");
	out.push_str("<style>body{font-family:sans-serif;max-width:900px;margin:2em auto}section{border:1px solid #ccc;padding:1em;margin-bottom:1em;border-radius:6px}img{max-width:100%}</style>\n");
	out.push_str("</head>\n<body>\n");
	let _ = write!(out, "<h1>Run {}</h1>\n", escape(&result.run_id));
	let _ = write!(out, "<p>success: {} &middot; cost: ${:.4}</p>\n", result.success, result.total_cost_usd);
	if let Some(answer) = &result.answer {
		let _ = write!(out, "<p><strong>Answer:</strong> {}</p>\n", escape(answer));
	}
	if let Some(error) = &result.error {
		let _ = write!(out, "<p><strong>Error:</strong> {}</p>\n", escape(error));
	}

	for turn in &result.trajectory.turns {
		let _ = write!(out, "<section>\n<h2>Turn {}</h2>\n", turn.index);
		for content in &turn.request.content {
			match content {
				MessageContent::Text { text } => {
					let _ = write!(out, "<p>{}</p>\n", escape(text));
				}
				MessageContent::Image { media_type, data } => {
					let _ = write!(out, "<img src=\"data:{};base64,{}\" alt=\"turn {} crop\">\n", escape(media_type), data, turn.index);
				}
			}
		}
		match &turn.response.action {
			Action::Crop { region, level } => {
				let _ = write!(out, "<p>action: crop region=({},{},{}x{}) level={}</p>\n", region.x, region.y, region.width, region.height, level);
			}
			Action::Answer { text } => {
				let _ = write!(out, "<p>action: answer &mdash; {}</p>\n", escape(text));
			}
			Action::Conch { note } => {
				let _ = write!(out, "<p>action: conch &mdash; {}</p>\n", escape(note));
			}
		}
		out.push_str("</section>\n");
	}

	out.push_str("</body>\n</html>\n");
	out
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
