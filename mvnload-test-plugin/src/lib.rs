//! Exports `fixture.Counter` for the loader tests in `mvnload-core`.

use mvnload_component::{
    ComponentType, Registrar, ReturnKind, TypeTag, Value, export_components,
};

pub struct Counter {
    total: i64,
}

fn register(registrar: &mut dyn Registrar) {
    registrar.register_component(
        ComponentType::builder::<Counter>("fixture.Counter")
            .constructor(&[TypeTag::Long], |args| {
                Ok(Counter {
                    total: args[0].as_i64().unwrap_or_default(),
                })
            })
            .method(
                "add",
                &[TypeTag::Long],
                ReturnKind::Value(TypeTag::Long),
                |counter, args| {
                    counter.total += args[0].as_i64().unwrap_or_default();
                    Ok(Some(Value::Long(counter.total)))
                },
            )
            .static_method(
                "origin",
                &[],
                ReturnKind::Value(TypeTag::String),
                |_| Ok(Some(Value::from("library"))),
            )
            .build(),
    );
}

export_components!(register);
