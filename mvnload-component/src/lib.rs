//! Authoring API for components loaded by mvnload at runtime.
//!
//! A component library is a `cdylib` that builds [`ComponentType`]s with
//! [`ComponentType::builder`] and exports them with [`export_components!`].

pub mod compat;
pub mod component;
pub mod plugin;
pub mod value;

pub use compat::{accepts, coerce, coerce_all, matches_signature};
pub use component::{
    CallError, CallResult, Callable, ComponentBuilder, ComponentType, Constructor, Instance,
    Method, ReturnKind, StaticMethod,
};
pub use plugin::{ABI_VERSION, DECLARATION_SYMBOL, PluginDeclaration, Registrar};
pub use value::{TypeTag, Value};

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter {
        greeting: String,
    }

    fn register(registrar: &mut dyn Registrar) {
        registrar.register_component(
            ComponentType::builder::<Greeter>("demo.Greeter")
                .constructor(&[TypeTag::String], |args| {
                    Ok(Greeter {
                        greeting: args[0].as_str().unwrap_or("hello").to_string(),
                    })
                })
                .method(
                    "greet",
                    &[TypeTag::String],
                    ReturnKind::Value(TypeTag::String),
                    |greeter, args| {
                        let name = args[0].as_str().unwrap_or("world");
                        Ok(Some(Value::from(format!("{}, {}", greeter.greeting, name))))
                    },
                )
                .build(),
        );
    }

    export_components!(register);

    #[test]
    fn exported_declaration_registers_components() {
        assert_eq!(mvnload_plugin_declaration.abi_version, ABI_VERSION);

        let components = mvnload_plugin_declaration.collect();
        assert_eq!(components.len(), 1);

        let greeter = &components[0];
        let mut instance = greeter
            .find_constructor(&[Value::from("hi")])
            .unwrap()
            .construct(&[Value::from("hi")])
            .unwrap();

        let greet = greeter.find_method("greet", &[Value::from("bob")]).unwrap();
        let result = greet.call(instance.as_mut(), &[Value::from("bob")]).unwrap();
        assert_eq!(result, Some(Value::from("hi, bob")));
    }

    #[test]
    fn symbol_name_matches_exported_static() {
        assert_eq!(DECLARATION_SYMBOL, b"mvnload_plugin_declaration\0");
    }
}
