use crate::compat;
use crate::value::{TypeTag, Value};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Error raised by component code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CallError {
    message: String,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CallResult = Result<Option<Value>, CallError>;

/// Type-erased component state.
pub type Instance = Box<dyn Any + Send>;

type ConstructorFn = Arc<dyn Fn(&[Value]) -> Result<Instance, CallError> + Send + Sync>;
type MethodFn = Arc<dyn Fn(&mut (dyn Any + Send), &[Value]) -> CallResult + Send + Sync>;
type StaticFn = Arc<dyn Fn(&[Value]) -> CallResult + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Void,
    Value(TypeTag),
}

/// Anything selectable by name and parameter tags.
pub trait Callable {
    fn name(&self) -> &str;
    fn params(&self) -> &[TypeTag];

    fn accepts(&self, args: &[Value]) -> bool {
        compat::matches_signature(self.params(), args)
    }
}

#[derive(Clone)]
pub struct Constructor {
    params: Vec<TypeTag>,
    call: ConstructorFn,
}

impl Constructor {
    /// Coerces `args` and builds a new instance.
    pub fn construct(&self, args: &[Value]) -> Result<Instance, CallError> {
        let args = coerce_args(&self.params, args)?;
        (self.call)(&args)
    }
}

impl Callable for Constructor {
    fn name(&self) -> &str {
        "<init>"
    }

    fn params(&self) -> &[TypeTag] {
        &self.params
    }
}

#[derive(Clone)]
pub struct Method {
    name: String,
    params: Vec<TypeTag>,
    returns: ReturnKind,
    call: MethodFn,
}

impl Method {
    pub fn returns(&self) -> ReturnKind {
        self.returns
    }

    /// Coerces `args` and calls the method on `receiver`. Void methods yield `None`.
    pub fn call(&self, receiver: &mut (dyn Any + Send), args: &[Value]) -> CallResult {
        let args = coerce_args(&self.params, args)?;
        let result = (self.call)(receiver, &args)?;
        Ok(shape_result(self.returns, result))
    }
}

impl Callable for Method {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[TypeTag] {
        &self.params
    }
}

#[derive(Clone)]
pub struct StaticMethod {
    name: String,
    params: Vec<TypeTag>,
    returns: ReturnKind,
    call: StaticFn,
}

impl StaticMethod {
    pub fn returns(&self) -> ReturnKind {
        self.returns
    }

    pub fn call(&self, args: &[Value]) -> CallResult {
        let args = coerce_args(&self.params, args)?;
        let result = (self.call)(&args)?;
        Ok(shape_result(self.returns, result))
    }
}

impl Callable for StaticMethod {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[TypeTag] {
        &self.params
    }
}

fn coerce_args(params: &[TypeTag], args: &[Value]) -> Result<Vec<Value>, CallError> {
    compat::coerce_all(params, args).ok_or_else(|| {
        CallError::new(format!(
            "arguments ({}) do not fit parameters ({})",
            describe_args(args),
            describe_params(params)
        ))
    })
}

fn shape_result(returns: ReturnKind, result: Option<Value>) -> Option<Value> {
    match returns {
        ReturnKind::Void => None,
        ReturnKind::Value(_) => result,
    }
}

/// Comma separated runtime type names of `args`.
pub fn describe_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::type_name)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn describe_params(params: &[TypeTag]) -> String {
    params
        .iter()
        .map(|tag| tag.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First callable named `name` whose signature accepts `args`, in declaration order.
pub fn select<'a, C: Callable>(candidates: &'a [C], name: &str, args: &[Value]) -> Option<&'a C> {
    candidates
        .iter()
        .find(|candidate| candidate.name() == name && candidate.accepts(args))
}

/// A loadable component: a qualified name plus its constructors and entry points.
#[derive(Clone)]
pub struct ComponentType {
    name: String,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
    static_methods: Vec<StaticMethod>,
}

impl ComponentType {
    pub fn builder<T: Any + Send>(name: impl Into<String>) -> ComponentBuilder<T> {
        ComponentBuilder {
            ty: ComponentType {
                name: name.into(),
                constructors: Vec::new(),
                methods: Vec::new(),
                static_methods: Vec::new(),
            },
            _instance: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn static_methods(&self) -> &[StaticMethod] {
        &self.static_methods
    }

    pub fn find_constructor(&self, args: &[Value]) -> Option<&Constructor> {
        self.constructors
            .iter()
            .find(|constructor| constructor.accepts(args))
    }

    pub fn find_method(&self, name: &str, args: &[Value]) -> Option<&Method> {
        select(&self.methods, name, args)
    }

    pub fn find_static_method(&self, name: &str, args: &[Value]) -> Option<&StaticMethod> {
        select(&self.static_methods, name, args)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<String> = self
            .methods
            .iter()
            .map(|m| format!("{}({})", m.name, describe_params(&m.params)))
            .collect();
        let statics: Vec<String> = self
            .static_methods
            .iter()
            .map(|m| format!("{}({})", m.name, describe_params(&m.params)))
            .collect();

        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .field("constructors", &self.constructors.len())
            .field("methods", &methods)
            .field("static_methods", &statics)
            .finish()
    }
}

/// Builds a [`ComponentType`] whose instances are values of `T`.
///
/// Entries keep their declaration order, which is the order overload
/// selection walks.
pub struct ComponentBuilder<T> {
    ty: ComponentType,
    _instance: PhantomData<fn() -> T>,
}

impl<T: Any + Send> ComponentBuilder<T> {
    pub fn constructor<F>(mut self, params: &[TypeTag], construct: F) -> Self
    where
        F: Fn(&[Value]) -> Result<T, CallError> + Send + Sync + 'static,
    {
        self.ty.constructors.push(Constructor {
            params: params.to_vec(),
            call: Arc::new(move |args: &[Value]| {
                construct(args).map(|instance| Box::new(instance) as Instance)
            }),
        });
        self
    }

    pub fn method<F>(mut self, name: &str, params: &[TypeTag], returns: ReturnKind, body: F) -> Self
    where
        F: Fn(&mut T, &[Value]) -> CallResult + Send + Sync + 'static,
    {
        let type_name = self.ty.name.clone();
        self.ty.methods.push(Method {
            name: name.to_string(),
            params: params.to_vec(),
            returns,
            call: Arc::new(move |receiver: &mut (dyn Any + Send), args: &[Value]| {
                let receiver = receiver.downcast_mut::<T>().ok_or_else(|| {
                    CallError::new(format!("receiver is not an instance of {}", type_name))
                })?;
                body(receiver, args)
            }),
        });
        self
    }

    pub fn static_method<F>(
        mut self,
        name: &str,
        params: &[TypeTag],
        returns: ReturnKind,
        body: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        self.ty.static_methods.push(StaticMethod {
            name: name.to_string(),
            params: params.to_vec(),
            returns,
            call: Arc::new(body),
        });
        self
    }

    pub fn build(self) -> ComponentType {
        self.ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        total: i64,
    }

    fn counter_type() -> ComponentType {
        ComponentType::builder::<Counter>("test.Counter")
            .constructor(&[], |_| Ok(Counter::default()))
            .constructor(&[TypeTag::Long], |args| {
                Ok(Counter {
                    total: args[0].as_i64().unwrap_or_default(),
                })
            })
            .method("add", &[TypeTag::Long], ReturnKind::Void, |counter, args| {
                counter.total += args[0].as_i64().unwrap_or_default();
                Ok(None)
            })
            .method("add", &[TypeTag::String], ReturnKind::Void, |_, _| {
                Err(CallError::new("string overload"))
            })
            .method("total", &[], ReturnKind::Value(TypeTag::Long), |counter, _| {
                Ok(Some(Value::Long(counter.total)))
            })
            .static_method("zero", &[], ReturnKind::Value(TypeTag::Long), |_| {
                Ok(Some(Value::Long(0)))
            })
            .build()
    }

    #[test]
    fn selects_constructor_by_arity_and_tags() {
        let ty = counter_type();
        let constructor = ty.find_constructor(&[Value::Int(5)]).unwrap();
        let mut instance = constructor.construct(&[Value::Int(5)]).unwrap();

        let total = ty.find_method("total", &[]).unwrap();
        let result = total.call(instance.as_mut(), &[]).unwrap();
        assert_eq!(result, Some(Value::Long(5)));
    }

    #[test]
    fn first_compatible_overload_wins() {
        let ty = counter_type();
        let add = ty.find_method("add", &[Value::Int(2)]).unwrap();
        assert_eq!(add.params(), &[TypeTag::Long]);

        let add = ty.find_method("add", &[Value::Str("2".into())]).unwrap();
        assert_eq!(add.params(), &[TypeTag::String]);
    }

    #[test]
    fn void_methods_return_none() {
        let ty = counter_type();
        let mut instance = ty.find_constructor(&[]).unwrap().construct(&[]).unwrap();
        let add = ty.find_method("add", &[Value::Int(2)]).unwrap();
        assert_eq!(add.call(instance.as_mut(), &[Value::Int(2)]), Ok(None));
    }

    #[test]
    fn rejects_foreign_receiver() {
        let ty = counter_type();
        let mut wrong: Instance = Box::new(String::from("not a counter"));
        let total = ty.find_method("total", &[]).unwrap();
        let err = total.call(wrong.as_mut(), &[]).unwrap_err();
        assert!(err.message().contains("test.Counter"));
    }

    #[test]
    fn no_match_for_unknown_name_or_arity() {
        let ty = counter_type();
        assert!(ty.find_method("missing", &[]).is_none());
        assert!(ty.find_method("total", &[Value::Int(1)]).is_none());
        assert!(ty.find_static_method("zero", &[]).is_some());
    }
}
