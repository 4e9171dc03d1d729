//! Declaration structure model: the value-comparable tree a structural parser
//! produces for each submitted class, and against which exercise levels are graded.
//!
//! Member collections (modifiers, fields, methods, constructors, nested classes) are
//! kept in `BTreeSet`s, so equality is order-insensitive for them while parameter
//! lists stay order-sensitive `Vec`s. Equality is the derived one: exact and
//! transitive, an extra member on either side makes two trees unequal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Where a declaration lives.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationContextKind {
  /// Declared at the top level of the submission.
  TopLevel,
  /// Declared inside a type (fields, methods, nested classes).
  Type,
  /// Declared inside a method (parameters, locals, local classes).
  Method,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct VariableStructure {
  pub name: String,
  pub declaration_context: DeclarationContextKind,
  pub type_name: String,
}

impl VariableStructure {
  pub fn new(name: impl Into<String>, context: DeclarationContextKind, type_name: impl Into<String>) -> Self {
    Self { name: name.into(), declaration_context: context, type_name: type_name.into() }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FieldStructure {
  pub variable: VariableStructure,
  #[serde(default)]
  pub modifiers: BTreeSet<String>,
}

impl FieldStructure {
  pub fn new<I, S>(variable: VariableStructure, modifiers: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self { variable, modifiers: modifiers.into_iter().map(Into::into).collect() }
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorStructure {
  #[serde(default)]
  pub parameters: Vec<VariableStructure>,
}

impl ConstructorStructure {
  pub fn new(parameters: Vec<VariableStructure>) -> Self {
    Self { parameters }
  }
}

/// Body of a method. Only declared locals are tracked for now.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct MethodBodyStructure {
  #[serde(default)]
  pub variables: BTreeSet<VariableStructure>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct MethodStructure {
  pub name: String,
  pub declaration_context: DeclarationContextKind,
  pub return_type: String,
  #[serde(default)]
  pub modifiers: BTreeSet<String>,
  #[serde(default)]
  pub parameters: Vec<VariableStructure>,
  #[serde(default)]
  pub body: MethodBodyStructure,
}

impl MethodStructure {
  pub fn new<I, S>(
    name: impl Into<String>,
    context: DeclarationContextKind,
    return_type: impl Into<String>,
    modifiers: I,
    parameters: Vec<VariableStructure>,
  ) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      name: name.into(),
      declaration_context: context,
      return_type: return_type.into(),
      modifiers: modifiers.into_iter().map(Into::into).collect(),
      parameters,
      body: MethodBodyStructure::default(),
    }
  }

  pub fn with_locals(mut self, locals: impl IntoIterator<Item = VariableStructure>) -> Self {
    self.body.variables = locals.into_iter().collect();
    self
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ClassStructure {
  pub name: String,
  pub declaration_context: DeclarationContextKind,
  #[serde(default)]
  pub modifiers: BTreeSet<String>,
  #[serde(default)]
  pub fields: BTreeSet<FieldStructure>,
  #[serde(default)]
  pub methods: BTreeSet<MethodStructure>,
  #[serde(default)]
  pub constructors: BTreeSet<ConstructorStructure>,
  #[serde(default)]
  pub classes: BTreeSet<ClassStructure>,
}

impl ClassStructure {
  /// An empty class with the given modifiers. Members are added with the `with_*` builders.
  pub fn new<I, S>(name: impl Into<String>, context: DeclarationContextKind, modifiers: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      name: name.into(),
      declaration_context: context,
      modifiers: modifiers.into_iter().map(Into::into).collect(),
      fields: BTreeSet::new(),
      methods: BTreeSet::new(),
      constructors: BTreeSet::new(),
      classes: BTreeSet::new(),
    }
  }

  pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldStructure>) -> Self {
    self.fields.extend(fields);
    self
  }

  pub fn with_methods(mut self, methods: impl IntoIterator<Item = MethodStructure>) -> Self {
    self.methods.extend(methods);
    self
  }

  pub fn with_constructors(mut self, ctors: impl IntoIterator<Item = ConstructorStructure>) -> Self {
    self.constructors.extend(ctors);
    self
  }

  pub fn with_classes(mut self, classes: impl IntoIterator<Item = ClassStructure>) -> Self {
    self.classes.extend(classes);
    self
  }
}

/// First declaration named exactly `name` (case-sensitive).
pub fn find_class<'a>(declarations: &'a [ClassStructure], name: &str) -> Option<&'a ClassStructure> {
  declarations.iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
  use super::*;
  use super::DeclarationContextKind::*;

  fn field(name: &str) -> FieldStructure {
    FieldStructure::new(VariableStructure::new(name, Type, "float"), ["private"])
  }

  fn triangle() -> ClassStructure {
    ClassStructure::new("Triangle", TopLevel, ["public"]).with_fields([field("_base"), field("_height")])
  }

  #[test]
  fn equality_is_reflexive_and_symmetric() {
    let a = triangle();
    let b = triangle();
    assert_eq!(a, a);
    assert_eq!(a, b);
    assert_eq!(b, a);
  }

  #[test]
  fn member_order_does_not_matter() {
    let a = ClassStructure::new("Triangle", TopLevel, ["public", "sealed"])
      .with_fields([field("_height"), field("_base")]);
    let b = ClassStructure::new("Triangle", TopLevel, ["sealed", "public"])
      .with_fields([field("_base"), field("_height")]);
    assert_eq!(a, b);
  }

  #[test]
  fn parameter_order_matters() {
    let p = |n: &str| VariableStructure::new(n, Method, "float");
    let a = ConstructorStructure::new(vec![p("base"), p("height")]);
    let b = ConstructorStructure::new(vec![p("height"), p("base")]);
    assert_ne!(a, b);
  }

  #[test]
  fn extra_or_missing_members_break_equality() {
    let expected = triangle();
    let bigger = triangle().with_fields([field("_side")]);
    assert_ne!(bigger, expected);
    assert_ne!(expected, bigger);

    let extra_modifier = ClassStructure::new("Triangle", TopLevel, ["public", "static"])
      .with_fields([field("_base"), field("_height")]);
    assert_ne!(extra_modifier, expected);
  }

  #[test]
  fn nested_differences_are_detected() {
    let inner = |ty: &str| {
      ClassStructure::new("Point", Type, ["private"])
        .with_fields([FieldStructure::new(VariableStructure::new("x", Type, ty), ["public"])])
    };
    let a = triangle().with_classes([inner("float")]);
    let b = triangle().with_classes([inner("double")]);
    assert_ne!(a, b);
    assert_eq!(a, triangle().with_classes([inner("float")]));
  }

  #[test]
  fn method_locals_participate_in_equality() {
    let m = MethodStructure::new("calculateArea", Type, "float", ["public"], vec![]);
    let with_local = m.clone().with_locals([VariableStructure::new("area", Method, "float")]);
    assert_ne!(m, with_local);
  }

  #[test]
  fn json_roundtrip_keeps_equality() {
    let a = triangle();
    let json = serde_json::to_string(&a).unwrap();
    assert!(json.contains("\"declarationContext\":\"topLevel\""));
    let back: ClassStructure = serde_json::from_str(&json).unwrap();
    assert_eq!(a, back);
  }

  #[test]
  fn find_class_is_case_sensitive() {
    let decls = vec![ClassStructure::new("triangle", TopLevel, ["public"]), triangle()];
    assert_eq!(find_class(&decls, "Triangle"), Some(&decls[1]));
    assert!(find_class(&decls, "TRIANGLE").is_none());
  }
}
