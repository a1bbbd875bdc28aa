#![no_main]

use cf_core::{PolicyConfig, default_languages};
use cf_project::{SubstringSelection, project_flat, project_languages};
use libfuzzer_sys::fuzz_target;

// Whatever survives parsing must project cleanly: both outputs serialize
// and the metadata agrees with the array it describes.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(outcome) = cf_parser::parse(text) else {
        return;
    };

    let policy = PolicyConfig::default();
    let flat = project_flat(&outcome.graph, &policy, "fuzz");
    assert_eq!(flat.metadata.total_nodes, flat.nodes.len());
    let _ = serde_json::to_vec(&flat);

    let prompts = project_languages(&outcome.graph, &default_languages(), &SubstringSelection);
    let _ = serde_json::to_vec(&prompts.render());
});
