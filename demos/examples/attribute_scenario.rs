// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute store walkthrough.
//!
//! Build up `Attack` from a base value and a stack of modifiers, then
//! change its inputs and watch the value follow.
//!
//! Run:
//! - `cargo run -p understory_demos --example attribute_scenario`
//! - `RUST_LOG=understory_attribute=debug cargo run -p understory_demos --example attribute_scenario`

use understory_attribute::{AttributeError, AttributeStore, Modifier};

fn show(store: &mut AttributeStore, step: &str) -> Result<(), AttributeError> {
    let attack = store.get_value("Attack")?;
    println!("{step:<40} Attack = {attack}");
    Ok(())
}

fn main() -> Result<(), AttributeError> {
    understory_demos::init_tracing();
    tracing::info!("attribute scenario starting");

    let mut store = AttributeStore::new();
    store.add_attribute("HP", 100.0)?;
    store.add_attribute("Attack", 10.0)?;
    store.add_attribute("Defense", 5.0)?;
    show(&mut store, "base")?;

    store.add_modifier(Modifier::additive("Attack", 5.0))?;
    show(&mut store, "+5")?;

    store.add_modifier(Modifier::multiplicative("Attack", 1.5))?;
    show(&mut store, "x1.5")?;

    store.add_modifier(Modifier::extra_multiplicative("Attack", 0.1))?;
    show(&mut store, "+10% extra")?;

    let sync = store.add_modifier(Modifier::sync_from("Attack", "Defense"))?;
    show(&mut store, "sync from Defense")?;

    store.add_modifier(Modifier::dependency_scaled("Attack", "HP", 0.1))?;
    show(&mut store, "+10% of HP (masked by sync)")?;

    store.set_base_value("Defense", 20.0)?;
    println!("{:<40} Defense = {}", "Defense base -> 20", store.get_value("Defense")?);
    show(&mut store, "Defense base -> 20")?;

    store.set_base_value("HP", 200.0)?;
    show(&mut store, "HP base -> 200")?;

    store.remove_modifier(sync);
    show(&mut store, "sync removed")?;

    tracing::info!(attributes = store.len(), "attribute scenario finished");
    Ok(())
}
