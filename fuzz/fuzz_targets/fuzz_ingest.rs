#![no_main]

use cmmo::harmonize::{harmonize, HarmonizeOptions};
use cmmo::ingest::{parse_bytes, IngestLimits, IngestOptions};
use cmmo::mapping::propose_mapping;
use cmmo::schema::SchemaRegistry;
use cmmo::validator::{validate, Ruleset, ValidationOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed uploads must surface as ParseError, never a panic
    let options = IngestOptions::new().with_limits(IngestLimits {
        max_rows: 1_000,
        max_bytes: 1 << 20,
    });
    let Ok(table) = parse_bytes(data, &options) else {
        return;
    };

    // Whatever parsed goes through the proposal and, when it confirms, the rest
    let registry = SchemaRegistry::builtin();
    let Ok(template) = registry.get("cosmx", "1.2") else {
        return;
    };
    let proposal = propose_mapping(table.columns(), template);
    let Ok(confirmed) = proposal.to_draft().confirm(&table, template) else {
        return;
    };
    if let Ok(dataset) = harmonize(&table, &confirmed, template, &HarmonizeOptions::sequential()) {
        let _ = validate(
            &dataset,
            &table,
            template,
            &Ruleset::latest(),
            &ValidationOptions::default(),
        );
    }
});
