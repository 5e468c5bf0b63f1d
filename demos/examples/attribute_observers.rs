// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute change notification.
//!
//! Wire a store-wide listener and a per-attribute observer, then show that
//! changes are reported lazily, once per recompute, and that a cyclic
//! dependency is refused.
//!
//! Run:
//! - `cargo run -p understory_demos --example attribute_observers`

use std::sync::Arc;

use understory_attribute::{
    AttributeChange, AttributeError, AttributeObserver, AttributeStore, Modifier,
};

struct Hud;

impl AttributeObserver for Hud {
    fn on_attribute_changed(&self, change: &AttributeChange<'_>) {
        println!(
            "  hud: {} {} -> {}",
            change.name, change.old_value, change.new_value
        );
    }
}

fn main() -> Result<(), AttributeError> {
    understory_demos::init_tracing();
    tracing::info!("attribute observers starting");

    let mut store = AttributeStore::new();
    store.on_change(|change: &AttributeChange<'_>| {
        println!("  log: {} changed", change.name);
    });
    store.register_observer("Armor", Arc::new(Hud));

    store.add_attribute("Strength", 10.0)?;
    store.add_modifier(Modifier::dependency_scaled("Armor", "Strength", 2.0))?;
    println!("Armor = {}", store.get_value("Armor")?);

    println!("Strength base -> 15 (nothing printed until read)");
    store.set_base_value("Strength", 15.0)?;
    println!("Armor dirty: {}", store.is_dirty("Armor"));
    println!("Armor = {}", store.get_value("Armor")?);

    match store.add_dependency("Strength", "Armor") {
        Err(err @ AttributeError::CycleDetected { .. }) => println!("refused: {err}"),
        other => other?,
    }

    tracing::info!("attribute observers finished");
    Ok(())
}
