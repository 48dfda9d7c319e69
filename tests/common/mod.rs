#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use naivetrack::{ChromosomeList, MergeConfig, TrackEntry, TrackParser};

/// One allele line: sequence, depth, quality, sample.
pub type AlleleLine<'a> = (&'a str, u64, u64, &'a str);

/// Render one record in the native track format.
pub fn record(chromosome: &str, coordinate: u64, reference: &str, alleles: &[AlleleLine]) -> String {
    let depth: u64 = alleles.iter().map(|allele| allele.1).sum();
    let quality: u64 = alleles.iter().map(|allele| allele.2).sum();
    let mut text = format!(
        "{chromosome}\t{coordinate}\t{reference}\t{}\t{depth}\t{quality}\n",
        alleles.len()
    );
    for (sequence, depth, quality, sample) in alleles {
        text.push_str(&format!("\t{sequence}\t{depth}\t{quality}\t{sample}, forward\n"));
    }
    text
}

/// Parser over in-memory sources, registered in order.
pub fn parser_over(sources: Vec<String>, config: MergeConfig) -> TrackParser<Cursor<Vec<u8>>> {
    let mut parser = TrackParser::with_config(config).expect("valid merge configuration");
    for source in sources {
        parser.register(Cursor::new(source.into_bytes()));
    }
    parser
}

/// Parser over in-memory sources with a fixed chromosome order.
pub fn seeded_parser_over(
    sources: Vec<String>,
    chromosomes: &[&str],
    config: MergeConfig,
) -> TrackParser<Cursor<Vec<u8>>> {
    let mut parser = TrackParser::with_chromosomes(config, ChromosomeList::from_names(chromosomes))
        .expect("valid merge configuration");
    for source in sources {
        parser.register(Cursor::new(source.into_bytes()));
    }
    parser
}

/// Render merged entries the way the CLI writes them.
pub fn render(parser: &mut TrackParser<Cursor<Vec<u8>>>) -> String {
    let mut text = String::new();
    while let Some(entry) = parser.next_entry().expect("merge succeeds") {
        text.push_str(&format!("{}\n", entry.display(parser.chromosomes())));
    }
    text
}

/// `chrom:coordinate` labels of merged entries.
pub fn labels(parser: &TrackParser<Cursor<Vec<u8>>>, entries: &[TrackEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let name = entry
                .position
                .chromosome_name(parser.chromosomes())
                .unwrap_or("?");
            format!("{name}:{}", entry.position.coordinate)
        })
        .collect()
}

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("NAIVETRACK_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set NAIVETRACK_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}
