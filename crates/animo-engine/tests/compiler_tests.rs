mod common;

use animo_engine::{compile, AnalysisError, CompilationError};
use animo_model::{Model, Table, TimeBounds};

use common::{assemble, demo_network, two_reactant_network};

#[test]
fn compiling_twice_gives_identical_text() {
    let model = assemble(&demo_network());
    let first = compile(&model).unwrap();
    let second = compile(&model).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reassembling_the_network_gives_identical_text() {
    let desc = demo_network();
    let a = compile(&assemble(&desc)).unwrap();
    let b = compile(&assemble(&desc)).unwrap();
    assert_eq!(a.text, b.text);
}

#[test]
fn document_is_well_framed() {
    let compiled = compile(&assemble(&two_reactant_network())).unwrap();
    let text = &compiled.text;
    assert!(text.starts_with("<?xml version='1.0' encoding='utf-8'?>"));
    assert!(text.trim_end().ends_with("</nta>"));
    assert_eq!(text.matches("<template>").count(), text.matches("</template>").count());
    assert!(text.contains("const int INFINITE_TIME = -1;"));
    assert!(text.contains("clock globalTime;"));
    assert!(text.contains("const int N_REACTANTS = 2;"));
    assert!(text.contains("broadcast chan reaction_happening[N_REACTANTS];"));
}

#[test]
fn disabled_reaction_is_not_instantiated() {
    let mut desc = two_reactant_network();
    desc.reactions[1].enabled = false;
    let compiled = compile(&assemble(&desc)).unwrap();
    assert!(!compiled.text.contains("Reaction2_R0_R1"));
    assert!(compiled.text.contains("system P0;"));
}

#[test]
fn bi_reaction_with_a_flat_table_is_rejected() {
    let assembled = assemble(&two_reactant_network());
    let mut model = Model::new(assembled.settings.clone());
    for r in assembled.reactants() {
        model.add_reactant(r.clone()).unwrap();
    }
    let mut reaction = assembled.reactions().nth(1).unwrap().clone();
    let flat = reaction.bounds.as_ref().unwrap().lower.values().to_vec();
    let table = Table::from_values(vec![flat.len()], flat).unwrap();
    reaction.bounds = Some(TimeBounds {
        lower: table.clone(),
        upper: table,
    });
    model.add_reaction(reaction).unwrap();

    let err = compile(&model).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Compilation(CompilationError::Dimensions {
            expected: 2,
            found: 1,
            ..
        })
    ));
}
