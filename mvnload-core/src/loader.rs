use crate::{MvnloadError, Result};
use libloading::Library;
use mvnload_component::component::describe_args;
use mvnload_component::{
    ABI_VERSION, CallError, ComponentType, DECLARATION_SYMBOL, Instance, PluginDeclaration, Value,
};
use std::any::Any;
use std::env::consts::DLL_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A component type plus the library its code lives in.
#[derive(Debug)]
struct LoadedType {
    ty: ComponentType,
    // Declared after `ty` so the code outlives the closures that point into it.
    _library: Option<Arc<Library>>,
}

/// Component types visible to one session, in registration order.
///
/// Lookups by name return the first registered type, so locations loaded
/// earlier shadow later ones.
#[derive(Debug, Default)]
pub struct LoadingContext {
    types: Vec<Arc<LoadedType>>,
    locations: Vec<PathBuf>,
}

impl LoadingContext {
    pub fn new<I, P>(locations: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut context = LoadingContext::default();
        context.extend(locations)?;
        Ok(context)
    }

    /// Loads more locations. Types already visible keep priority.
    ///
    /// Nothing is committed unless every location loads.
    pub fn extend<I, P>(&mut self, locations: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut types = Vec::new();
        let mut paths = Vec::new();

        for location in locations {
            let path = location_path(location.as_ref())?;

            for library_path in library_files(&path)? {
                types.extend(load_library(&library_path)?);
            }

            paths.push(path);
        }

        self.types.extend(types);
        self.locations.extend(paths);
        Ok(())
    }

    /// Makes an in-process component type available.
    pub fn register(&mut self, ty: ComponentType) {
        debug!(component = ty.name(), "registered host component");
        self.types.push(Arc::new(LoadedType { ty, _library: None }));
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.types.iter().map(|loaded| loaded.ty.name()).collect()
    }

    /// Builds an instance with the first constructor that accepts `args`.
    pub fn instantiate(&self, name: &str, args: &[Value]) -> Result<Component> {
        let loaded = self.find(name)?;

        let constructor = loaded.ty.find_constructor(args).ok_or_else(|| {
            MvnloadError::NoCompatibleConstructor {
                name: name.to_string(),
                args: describe_args(args),
            }
        })?;

        let state = constructor
            .construct(args)
            .map_err(|error| invocation(name, "<init>", error))?;

        Ok(Component {
            state,
            loaded: loaded.clone(),
        })
    }

    pub fn invoke_static(&self, name: &str, method: &str, args: &[Value]) -> Result<Option<Value>> {
        let loaded = self.find(name)?;
        call_static(&loaded.ty, method, args)
    }

    fn find(&self, name: &str) -> Result<&Arc<LoadedType>> {
        self.types
            .iter()
            .find(|loaded| loaded.ty.name() == name)
            .ok_or_else(|| MvnloadError::ComponentNotFound {
                name: name.to_string(),
            })
    }
}

fn load_library(path: &Path) -> Result<Vec<Arc<LoadedType>>> {
    // SAFETY: loading runs the library's initializers; libraries are trusted
    // with full host privileges.
    let library = unsafe { Library::new(path) }.map_err(|source| {
        MvnloadError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        }
    })?;

    // SAFETY: the symbol is the static emitted by `export_components!`, whose
    // type is `PluginDeclaration`.
    let declaration: PluginDeclaration = unsafe {
        library
            .get::<*const PluginDeclaration>(DECLARATION_SYMBOL)
            .map_err(|source| MvnloadError::LibraryLoad {
                path: path.to_path_buf(),
                source,
            })?
            .read()
    };

    if declaration.abi_version != ABI_VERSION {
        return Err(MvnloadError::IncompatibleComponentAbi {
            path: path.to_path_buf(),
            found: declaration.abi_version.to_string(),
            expected: ABI_VERSION.to_string(),
        });
    }

    let library = Arc::new(library);
    let components = declaration.collect();

    info!(
        path = %path.display(),
        components = components.len(),
        "loaded component library"
    );

    Ok(components
        .into_iter()
        .map(|ty| {
            Arc::new(LoadedType {
                ty,
                _library: Some(library.clone()),
            })
        })
        .collect())
}

/// A live component instance.
pub struct Component {
    // Dropped before `loaded`, which may hold the instance's code.
    state: Instance,
    loaded: Arc<LoadedType>,
}

impl Component {
    pub fn type_name(&self) -> &str {
        self.loaded.ty.name()
    }

    /// Calls the first instance method named `method` that accepts `args`.
    /// Void methods return `None`.
    pub fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>> {
        let ty = &self.loaded.ty;

        let target = ty.find_method(method, args).ok_or_else(|| {
            MvnloadError::NoCompatibleMethod {
                component: ty.name().to_string(),
                method: method.to_string(),
                args: describe_args(args),
            }
        })?;

        target
            .call(self.state.as_mut(), args)
            .map_err(|error| invocation(ty.name(), method, error))
    }

    /// Calls a static method of this instance's type.
    pub fn invoke_static(&self, method: &str, args: &[Value]) -> Result<Option<Value>> {
        call_static(&self.loaded.ty, method, args)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.state.downcast_mut::<T>()
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.type_name())
            .finish_non_exhaustive()
    }
}

fn call_static(ty: &ComponentType, method: &str, args: &[Value]) -> Result<Option<Value>> {
    let target = ty.find_static_method(method, args).ok_or_else(|| {
        MvnloadError::NoCompatibleMethod {
            component: ty.name().to_string(),
            method: method.to_string(),
            args: describe_args(args),
        }
    })?;

    target
        .call(args)
        .map_err(|error| invocation(ty.name(), method, error))
}

fn invocation(component: &str, method: &str, error: CallError) -> MvnloadError {
    MvnloadError::Invocation {
        target: format!("{}.{}", component, method),
        reason: error.message().to_string(),
    }
}

/// Accepts plain paths and `file://` URLs.
fn location_path(location: &Path) -> Result<PathBuf> {
    let Some(text) = location.to_str() else {
        return Ok(location.to_path_buf());
    };

    if let Some(path) = text.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }

    if text.contains("://") {
        return Err(MvnloadError::UnsupportedLocation {
            location: text.to_string(),
        });
    }

    Ok(location.to_path_buf())
}

/// A directory contributes its shared libraries, sorted by name; anything
/// else is taken to be a library itself.
fn library_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = fs::read_dir(path).map_err(|source| MvnloadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let mut libraries = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MvnloadError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file = entry.path();

        if file.is_file() && file.extension().is_some_and(|ext| ext == DLL_EXTENSION) {
            libraries.push(file);
        }
    }

    libraries.sort();
    Ok(libraries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvnload_component::{ReturnKind, TypeTag};

    struct Calculator {
        total: f64,
    }

    fn calculator_type(name: &str) -> ComponentType {
        ComponentType::builder::<Calculator>(name)
            .constructor(&[], |_| Ok(Calculator { total: 0.0 }))
            .constructor(&[TypeTag::Double], |args| {
                Ok(Calculator {
                    total: args[0].as_f64().unwrap_or_default(),
                })
            })
            .method("add", &[TypeTag::Long], ReturnKind::Void, |calc, args| {
                calc.total += args[0].as_f64().unwrap_or_default();
                Ok(None)
            })
            .method("add", &[TypeTag::String], ReturnKind::Void, |_, _| {
                Err(CallError::new("strings are not numbers"))
            })
            .method("total", &[], ReturnKind::Value(TypeTag::Double), |calc, _| {
                Ok(Some(Value::Double(calc.total)))
            })
            .static_method(
                "square",
                &[TypeTag::Long],
                ReturnKind::Value(TypeTag::Long),
                |args| {
                    let value = args[0].as_i64().unwrap_or_default();
                    Ok(Some(Value::Long(value * value)))
                },
            )
            .build()
    }

    fn context() -> LoadingContext {
        let mut context = LoadingContext::default();
        context.register(calculator_type("demo.Calculator"));
        context
    }

    #[test]
    fn instantiates_and_invokes_with_widening() {
        let context = context();
        let mut calc = context
            .instantiate("demo.Calculator", &[Value::Int(2)])
            .unwrap();

        assert_eq!(calc.invoke("add", &[Value::Int(3)]).unwrap(), None);
        assert_eq!(
            calc.invoke("total", &[]).unwrap(),
            Some(Value::Double(5.0))
        );
        assert_eq!(calc.downcast_ref::<Calculator>().map(|c| c.total), Some(5.0));
    }

    #[test]
    fn int_argument_selects_long_overload() {
        let context = context();
        let mut calc = context.instantiate("demo.Calculator", &[]).unwrap();
        assert!(calc.invoke("add", &[Value::Int(1)]).is_ok());

        let error = calc.invoke("add", &[Value::from("1")]).unwrap_err();
        assert!(matches!(
            error,
            MvnloadError::Invocation { ref target, .. } if target == "demo.Calculator.add"
        ));
    }

    #[test]
    fn reports_missing_types_and_signatures() {
        let context = context();

        assert!(matches!(
            context.instantiate("demo.Missing", &[]),
            Err(MvnloadError::ComponentNotFound { .. })
        ));
        assert!(matches!(
            context.instantiate("demo.Calculator", &[Value::from("x")]),
            Err(MvnloadError::NoCompatibleConstructor { .. })
        ));

        let mut calc = context.instantiate("demo.Calculator", &[]).unwrap();
        let error = calc.invoke("total", &[Value::Int(1)]).unwrap_err();
        assert!(matches!(error, MvnloadError::NoCompatibleMethod { .. }));
        assert!(error.to_string().contains("(int)"));
    }

    #[test]
    fn invokes_static_methods() {
        let context = context();
        assert_eq!(
            context
                .invoke_static("demo.Calculator", "square", &[Value::Int(7)])
                .unwrap(),
            Some(Value::Long(49))
        );

        let calc = context.instantiate("demo.Calculator", &[]).unwrap();
        assert_eq!(
            calc.invoke_static("square", &[Value::Long(3)]).unwrap(),
            Some(Value::Long(9))
        );
    }

    #[test]
    fn first_registered_type_wins() {
        let mut context = context();
        context.register(
            ComponentType::builder::<()>("demo.Calculator")
                .constructor(&[], |_| Ok(()))
                .build(),
        );

        let calc = context.instantiate("demo.Calculator", &[]).unwrap();
        assert!(calc.downcast_ref::<Calculator>().is_some());
        assert_eq!(context.component_names(), vec!["demo.Calculator", "demo.Calculator"]);
    }

    #[test]
    fn rejects_remote_locations() {
        let error = LoadingContext::new(["https://example.com/plugin.so"]).unwrap_err();
        assert!(matches!(error, MvnloadError::UnsupportedLocation { .. }));
    }

    #[test]
    fn directories_contribute_only_shared_libraries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib-1.0.jar"), b"not a library").unwrap();

        let context = LoadingContext::new([dir.path()]).unwrap();
        assert!(context.component_names().is_empty());
        assert_eq!(context.locations(), &[dir.path().to_path_buf()]);
    }

    #[test]
    fn file_urls_resolve_to_paths() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", dir.path().display());

        let context = LoadingContext::new([url.as_str()]).unwrap();
        assert_eq!(context.locations(), &[dir.path().to_path_buf()]);
    }

    #[test]
    fn unreadable_library_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join(format!("bogus.{}", DLL_EXTENSION));
        std::fs::write(&bogus, b"garbage").unwrap();

        let error = LoadingContext::new([bogus.as_path()]).unwrap_err();
        assert!(matches!(error, MvnloadError::LibraryLoad { .. }));
    }

    fn fixture_library() -> PathBuf {
        let name = format!(
            "{}mvnload_test_plugin.{}",
            std::env::consts::DLL_PREFIX,
            DLL_EXTENSION
        );
        let exe = std::env::current_exe().unwrap();

        exe.ancestors()
            .skip(1)
            .take(2)
            .map(|dir| dir.join(&name))
            .find(|path| path.is_file())
            .unwrap_or_else(|| panic!("{name} was not built next to {}", exe.display()))
    }

    fn host_counter() -> ComponentType {
        ComponentType::builder::<()>("fixture.Counter")
            .constructor(&[], |_| Ok(()))
            .static_method(
                "origin",
                &[],
                ReturnKind::Value(TypeTag::String),
                |_| Ok(Some(Value::from("host"))),
            )
            .build()
    }

    fn origin(context: &LoadingContext) -> Option<Value> {
        context
            .invoke_static("fixture.Counter", "origin", &[])
            .unwrap()
    }

    #[test]
    fn loads_components_from_library_directories() {
        let library = fixture_library();
        let dir = tempfile::tempdir().unwrap();
        std::fs::copy(&library, dir.path().join(library.file_name().unwrap())).unwrap();

        let context = LoadingContext::new([dir.path()]).unwrap();
        assert_eq!(context.component_names(), vec!["fixture.Counter"]);
        assert_eq!(context.locations(), &[dir.path().to_path_buf()]);

        let mut counter = context
            .instantiate("fixture.Counter", &[Value::Int(5)])
            .unwrap();
        assert_eq!(
            counter.invoke("add", &[Value::Int(2)]).unwrap(),
            Some(Value::Long(7))
        );
        assert_eq!(
            counter.invoke_static("origin", &[]).unwrap(),
            Some(Value::from("library"))
        );
        assert_eq!(counter.type_name(), "fixture.Counter");
    }

    #[test]
    fn earlier_types_shadow_later_libraries() {
        let library = fixture_library();

        let mut host_first = LoadingContext::default();
        host_first.register(host_counter());
        host_first.extend([library.as_path()]).unwrap();
        assert_eq!(
            host_first.component_names(),
            vec!["fixture.Counter", "fixture.Counter"]
        );
        assert_eq!(origin(&host_first), Some(Value::from("host")));

        let mut library_first = LoadingContext::new([library.as_path()]).unwrap();
        library_first.register(host_counter());
        assert_eq!(origin(&library_first), Some(Value::from("library")));
    }

    #[test]
    fn failed_extend_commits_nothing() {
        let library = fixture_library();
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join(format!("bogus.{}", DLL_EXTENSION));
        std::fs::write(&bogus, b"garbage").unwrap();

        let mut context = LoadingContext::default();
        context.register(host_counter());

        let error = context
            .extend([library.as_path(), bogus.as_path()])
            .unwrap_err();
        assert!(matches!(error, MvnloadError::LibraryLoad { .. }));
        assert_eq!(context.component_names(), vec!["fixture.Counter"]);
        assert!(context.locations().is_empty());
        assert_eq!(origin(&context), Some(Value::from("host")));
    }
}
