//! Built-in exercise used when no exercise config is supplied.

use crate::domain::{
  ClassStructure, ConstructorStructure, DeclarationContextKind::*, FieldStructure, MethodStructure, VariableStructure,
};
use crate::progression::LevelTable;

pub const TRIANGLE: &str = "Triangle";

/// Four-step "Triangle" exercise: declare the class, add the two fields, add the
/// constructor, add `calculateArea`.
pub fn triangle_exercise() -> (String, LevelTable) {
  let base = FieldStructure::new(VariableStructure::new("_base", Type, "float"), ["private"]);
  let height = FieldStructure::new(VariableStructure::new("_height", Type, "float"), ["private"]);
  let ctor = ConstructorStructure::new(vec![
    VariableStructure::new("base", Method, "float"),
    VariableStructure::new("height", Method, "float"),
  ]);
  let area = MethodStructure::new("calculateArea", Type, "float", ["public"], vec![]);

  let class = || ClassStructure::new(TRIANGLE, TopLevel, ["public"]);
  let levels = vec![
    class(),
    class().with_fields([base.clone(), height.clone()]),
    class().with_fields([base.clone(), height.clone()]).with_constructors([ctor.clone()]),
    class().with_fields([base, height]).with_constructors([ctor]).with_methods([area]),
  ];
  (TRIANGLE.to_string(), LevelTable::new(levels))
}
