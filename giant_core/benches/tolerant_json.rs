use criterion::{black_box, criterion_group, criterion_main, Criterion};
use giant_core::json::parse_anchored_json_object;

const WRAPPED: &str = r#"Sure, here's my reasoning: I looked at the tissue and concluded the following. {"reasoning":"the glandular structures show clear architectural distortion consistent with invasive carcinoma","action":{"action_type":"crop","x":45000,"y":32000,"w":10000,"h":10000}} I hope this helps you make your diagnosis!"#;

fn benchmark_parse_anchored_json_object(c: &mut Criterion) {
	c.bench_function("parse_anchored_json_object", |b| {
		b.iter(|| parse_anchored_json_object(black_box(WRAPPED)));
	});
}

criterion_group!(
	name = benches;
	config = Criterion::default().significance_level(0.1).sample_size(50);
	targets = benchmark_parse_anchored_json_object
);
criterion_main!(benches);
