#![no_main]

use libfuzzer_sys::fuzz_target;
use retrace::Derivation;
use retrace_core::spec::TableSpec;
use retrace_core::{ParseTable, VecTokenStream};
use retrace_engine::{Engine, ParseOutcome};

const TABLE: &str = include_str!("../../tests/fixtures/ambiguous.json");

fuzz_target!(|data: &[u8]| {
    let Some((&repairs, rest)) = data.split_first() else {
        return;
    };
    let Ok(spec) = serde_json::from_str::<TableSpec>(TABLE) else {
        return;
    };
    let Ok(table) = spec.build() else {
        return;
    };
    let Ok(engine) = Engine::new(&table) else {
        return;
    };

    // Every terminal except end-of-input may appear, the error terminal included
    let terminals = table.terminal_count() - 1;
    let kinds: Vec<u32> = rest.iter().map(|&b| 1 + u32::from(b) % terminals).collect();
    let mut stream = VecTokenStream::from_kinds(&kinds, table.eof_symbol());
    let budget = i32::from(repairs as i8) % 4;

    if let ParseOutcome::Accepted(tokens) = engine.parse(&mut stream, &mut Derivation::new(), budget) {
        assert!(tokens.windows(2).all(|pair| pair[0] != pair[1]));
    }
});
