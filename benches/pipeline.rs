use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cmmo::export::{export_bundle, ManifestMeta};
use cmmo::harmonize::{harmonize, HarmonizeOptions};
use cmmo::ingest::{parse_bytes, IngestOptions};
use cmmo::mapping::FieldMapping;
use cmmo::schema::{SchemaRegistry, SchemaTemplate};
use cmmo::validator::{validate, Ruleset, ValidationOptions};

const HEADER: &str = "Sample_Name,Block,Slide_Barcode,ROI,Library,Run,Platform,Tissue,Collected\n";

/// Generate a clean CosMx sheet: 1000 ROIs, 4 per slide, one library per row
fn generate_sheet(num_rows: usize) -> Vec<u8> {
    let mut content = String::with_capacity(HEADER.len() + num_rows * 110);
    content.push_str(HEADER);

    for i in 0..num_rows {
        let roi = i % 1000;
        let slide = roi / 4;
        let block = slide / 8;
        let specimen = block / 2;
        content.push_str(&format!(
            "SPEC-2024-{:03},BLK-2024-{:03},SLD-2024-{:04},ROI-{:03},LIB-{}-{:03},RUN-2024-{:03},CosMx,FFPE_Tumor,03/{:02}/2024\n",
            specimen,
            block,
            slide,
            roi,
            2000 + i / 1000,
            i % 1000,
            i / 2000,
            specimen % 28 + 1,
        ));
    }

    content.into_bytes()
}

fn template() -> SchemaTemplate {
    SchemaRegistry::builtin()
        .get("cosmx", "1.2")
        .expect("built-in template")
        .clone()
}

fn mapping() -> FieldMapping {
    FieldMapping::new()
        .with("Specimen_ID", "Sample_Name")
        .with("Block_ID", "Block")
        .with("Slide_ID", "Slide_Barcode")
        .with("ROI_ID", "ROI")
        .with("Library_ID", "Library")
        .with("Run_ID", "Run")
        .with("Platform", "Platform")
        .with("Tissue_Type", "Tissue")
        .with("Collection_Date", "Collected")
}

/// Benchmark CSV ingest throughput
fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.sample_size(10);

    for num_rows in [10_000, 50_000, 200_000] {
        let bytes = generate_sheet(num_rows);
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(num_rows), &bytes, |b, bytes| {
            b.iter(|| parse_bytes(bytes, &IngestOptions::default()).expect("Parse failed"));
        });
    }

    group.finish();
}

/// Benchmark harmonization, sequential and row-parallel
fn bench_harmonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("harmonize");
    group.sample_size(10);
    let template = template();

    for num_rows in [10_000, 50_000, 200_000] {
        let table = parse_bytes(&generate_sheet(num_rows), &IngestOptions::default())
            .expect("Parse failed");
        let confirmed = mapping().confirm(&table, &template).expect("Mapping rejected");
        group.throughput(Throughput::Elements(num_rows as u64));

        for (label, options) in [
            ("sequential", HarmonizeOptions::sequential()),
            ("parallel", HarmonizeOptions::default()),
        ] {
            group.bench_with_input(BenchmarkId::new(label, num_rows), &options, |b, options| {
                b.iter(|| {
                    harmonize(&table, &confirmed, &template, options).expect("Harmonization failed")
                });
            });
        }
    }

    group.finish();
}

/// Benchmark the full path from bytes to an in-memory bundle
fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(10);
    let template = template();
    let ruleset = Ruleset::latest();

    for num_rows in [10_000, 200_000] {
        let bytes = generate_sheet(num_rows);
        group.throughput(Throughput::Elements(num_rows as u64));

        group.bench_with_input(BenchmarkId::from_parameter(num_rows), &bytes, |b, bytes| {
            b.iter(|| {
                let table = parse_bytes(bytes, &IngestOptions::default()).expect("Parse failed");
                let confirmed = mapping().confirm(&table, &template).expect("Mapping rejected");
                let dataset = harmonize(&table, &confirmed, &template, &HarmonizeOptions::default())
                    .expect("Harmonization failed");
                let outcome = validate(
                    &dataset,
                    &table,
                    &template,
                    &ruleset,
                    &ValidationOptions::default(),
                )
                .expect("Validation failed");
                export_bundle(&dataset, &outcome, &template, ManifestMeta::now())
                    .expect("Export failed")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ingest, bench_harmonize, bench_end_to_end);
criterion_main!(benches);
