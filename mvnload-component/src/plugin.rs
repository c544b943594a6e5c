use crate::component::ComponentType;

/// ABI stamp carried by every exported declaration. Hosts refuse libraries
/// built against a different release of this crate.
pub const ABI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Null-terminated name of the symbol emitted by [`export_components!`](crate::export_components).
pub const DECLARATION_SYMBOL: &[u8] = b"mvnload_plugin_declaration\0";

/// Receives the component types a library provides.
pub trait Registrar {
    fn register_component(&mut self, component: ComponentType);
}

impl Registrar for Vec<ComponentType> {
    fn register_component(&mut self, component: ComponentType) {
        self.push(component);
    }
}

#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub abi_version: &'static str,
    pub register: fn(&mut dyn Registrar),
}

impl PluginDeclaration {
    /// Runs the registration function and returns the collected types.
    pub fn collect(&self) -> Vec<ComponentType> {
        let mut components = Vec::new();
        (self.register)(&mut components);
        components
    }
}

impl std::fmt::Debug for PluginDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDeclaration")
            .field("abi_version", &self.abi_version)
            .finish_non_exhaustive()
    }
}

/// Exports a registration function from a `cdylib` so hosts can discover
/// its component types.
///
/// ```ignore
/// fn register(registrar: &mut dyn mvnload_component::Registrar) {
///     registrar.register_component(greeter_type());
/// }
///
/// mvnload_component::export_components!(register);
/// ```
#[macro_export]
macro_rules! export_components {
    ($register:expr) => {
        #[doc(hidden)]
        #[unsafe(no_mangle)]
        #[allow(non_upper_case_globals)]
        pub static mvnload_plugin_declaration: $crate::PluginDeclaration =
            $crate::PluginDeclaration {
                abi_version: $crate::ABI_VERSION,
                register: $register,
            };
    };
}
