mod common;

use std::collections::HashSet;

use blake3::hash;
use common::{parser_over, record, render};
use naivetrack::MergeConfig;

fn sources() -> Vec<String> {
    (0..4u64)
        .map(|sample| {
            (0..200u64)
                .filter(|coordinate| coordinate % (sample + 2) == 0)
                .map(|coordinate| {
                    let chromosome = if coordinate < 120 { "chr1" } else { "chr2" };
                    let name = format!("S{sample}");
                    record(
                        chromosome,
                        coordinate * 137,
                        "T",
                        &[("G", sample + 1, coordinate % 60, name.as_str())],
                    )
                })
                .collect()
        })
        .collect()
}

#[test]
fn merge_output_is_deterministic() {
    let mut fingerprints = HashSet::new();
    for chunk_size in [3, 100, 10_000] {
        let config = MergeConfig::default()
            .with_chunk_size(chunk_size)
            .with_maximum_chromosome_size(1_000_000);
        let mut parser = parser_over(sources(), config);
        let output = render(&mut parser);
        assert!(!output.is_empty());
        fingerprints.insert(hash(output.as_bytes()));
    }

    assert_eq!(fingerprints.len(), 1, "outputs diverged across window sizes");
}
