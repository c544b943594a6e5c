//! Argument compatibility rules shared by constructor and method selection.

use crate::value::{TypeTag, Value};

/// Parameter tag → argument tags it accepts. Integers widen `int → long → double`.
static COMPATIBILITY: &[(TypeTag, &[TypeTag])] = &[
    (TypeTag::Bool, &[TypeTag::Bool]),
    (TypeTag::Int, &[TypeTag::Int]),
    (TypeTag::Long, &[TypeTag::Int, TypeTag::Long]),
    (
        TypeTag::Double,
        &[TypeTag::Int, TypeTag::Long, TypeTag::Double],
    ),
    (TypeTag::String, &[TypeTag::String]),
    (TypeTag::List, &[TypeTag::List]),
    (TypeTag::Map, &[TypeTag::Map]),
];

/// Whether an argument may be passed for a parameter of the given tag.
pub fn accepts(param: TypeTag, arg: &Value) -> bool {
    if param == TypeTag::Any {
        return true;
    }

    let Some(arg_tag) = arg.tag() else {
        return param.is_nullable();
    };

    COMPATIBILITY
        .iter()
        .find(|(tag, _)| *tag == param)
        .is_some_and(|(_, accepted)| accepted.contains(&arg_tag))
}

/// Whether `args` fit `params` one to one.
pub fn matches_signature(params: &[TypeTag], args: &[Value]) -> bool {
    params.len() == args.len()
        && params
            .iter()
            .zip(args)
            .all(|(param, arg)| accepts(*param, arg))
}

/// Converts an accepted argument to the parameter's representation.
pub fn coerce(param: TypeTag, arg: &Value) -> Option<Value> {
    if !accepts(param, arg) {
        return None;
    }

    let converted = match (param, arg) {
        (TypeTag::Long, Value::Int(value)) => Value::Long(i64::from(*value)),
        (TypeTag::Double, Value::Int(value)) => Value::Double(f64::from(*value)),
        (TypeTag::Double, Value::Long(value)) => Value::Double(*value as f64),
        _ => arg.clone(),
    };

    Some(converted)
}

/// Coerces every argument, or returns `None` if the signature does not fit.
pub fn coerce_all(params: &[TypeTag], args: &[Value]) -> Option<Vec<Value>> {
    if params.len() != args.len() {
        return None;
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| coerce(*param, arg))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_parameter_accepts_int_argument() {
        assert!(accepts(TypeTag::Long, &Value::Int(3)));
        assert_eq!(coerce(TypeTag::Long, &Value::Int(3)), Some(Value::Long(3)));
    }

    #[test]
    fn int_parameter_rejects_long_argument() {
        assert!(!accepts(TypeTag::Int, &Value::Long(3)));
    }

    #[test]
    fn string_parameter_rejects_numbers() {
        assert!(!accepts(TypeTag::String, &Value::Int(3)));
        assert!(accepts(TypeTag::String, &Value::Str("3".into())));
    }

    #[test]
    fn null_only_fits_nullable_parameters() {
        assert!(accepts(TypeTag::String, &Value::Null));
        assert!(accepts(TypeTag::Any, &Value::Null));
        assert!(!accepts(TypeTag::Int, &Value::Null));
        assert!(!accepts(TypeTag::Bool, &Value::Null));
    }

    #[test]
    fn signature_requires_matching_arity() {
        assert!(matches_signature(&[TypeTag::Long], &[Value::Int(1)]));
        assert!(!matches_signature(&[TypeTag::Long], &[]));
        assert!(!matches_signature(&[], &[Value::Int(1)]));
    }

    #[test]
    fn coerce_all_widens_each_argument() {
        let coerced = coerce_all(
            &[TypeTag::Double, TypeTag::Any],
            &[Value::Long(2), Value::Str("x".into())],
        );
        assert_eq!(
            coerced,
            Some(vec![Value::Double(2.0), Value::Str("x".into())])
        );
        assert_eq!(coerce_all(&[TypeTag::Int], &[Value::Double(1.0)]), None);
    }
}
