#![allow(dead_code)]

use std::path::{Path, PathBuf};

use animo_engine::{assemble_model, NetworkDescription, ReactantDescription, ReactionDescription};
use animo_model::Model;

pub fn load_demo(name: &str) -> String {
    let path = format!("{}/../../demos/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {path}: {e}"))
}

pub fn demo_network() -> NetworkDescription {
    NetworkDescription::from_json(&load_demo("network.json")).expect("demo network parses")
}

pub fn assemble(desc: &NetworkDescription) -> Model {
    let registry = desc.scenario_registry().expect("registry builds");
    assemble_model(desc, &registry).expect("model assembles")
}

/// A kinase that decays on its own and activates a substrate.
///
/// Compiled ids: `kinase` is `R0`, `substrate` is `R1` (step size 2).
pub fn two_reactant_network() -> NetworkDescription {
    let mut kinase = ReactantDescription::new("kinase");
    kinase.alias = Some("K".into());
    kinase.levels = Some(4);
    kinase.initial_level = 4;
    let mut substrate = ReactantDescription::new("substrate");
    substrate.alias = Some("S".into());
    substrate.levels = Some(4);
    substrate.initial_level = 0;
    substrate.step_size = 2.0;

    let mut decay = ReactionDescription::new("kinase", "kinase");
    decay.increment = -1;
    let mut activation = ReactionDescription::new("kinase", "substrate");
    activation.scenario = Some("Scenario 1".into());

    NetworkDescription {
        levels: 4,
        seconds_per_point: 12.0,
        time_scale_factor: 1.0,
        formulas: Default::default(),
        reactants: vec![kinase, substrate],
        reactions: vec![decay, activation],
    }
}

/// Verifier-style trace text with one `State` block per `(time, assignments)`.
pub fn trace_text(blocks: &[(f64, &str)]) -> String {
    let mut out = String::from("Options for the verification:\n  Generating some trace\n");
    for (time, vars) in blocks {
        out.push_str("State:\n( P0.reacting P1.not_reacting )\n");
        out.push_str(&format!("{vars} globalTime={time} \n\n"));
        out.push_str("Transitions:\n  P0.reacting->P0.resetting { 1, reaction_happening[0]!, 1 }\n\n");
    }
    out
}

/// Write an executable bash script standing in for `verifyta`.
#[cfg(unix)]
pub fn fake_verifier(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/bash\n{body}\n")).expect("write fake verifier");
    let mut perms = std::fs::metadata(&path).expect("stat fake verifier").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod fake verifier");
    path
}
