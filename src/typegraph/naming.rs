//! Canonical names of resolved types and members.
//!
//! Three renderings exist for every type:
//!
//! - the **qualified name** of a class, a `::` path of sanitized identifiers made of the
//!   namespace segments, the declaring chain and the simple name (`Game::Core::Outer::Inner`).
//!   A class in the global namespace gets `_` as its only namespace segment
//! - the **display name**, as C# source would spell the type (`List<int>`, `Outer.Inner`,
//!   `string[,]`). Method signatures are rendered with display names, and methods are ordered
//!   by that text
//! - the **native name**, the storage form of a value of the type in generated C++:
//!   `un_int` for primitives, `System_String_o*` for strings, `Game_Core_Player_o*` for
//!   reference types and the unpointered form for value types. Enums use the native name of
//!   their underlying primitive
//!
//! # Examples
//!
//! ```rust
//! use il2scope::typegraph::naming::{qualified_name, sanitize_identifier, unique_ids};
//!
//! assert_eq!(sanitize_identifier("List`1"), "List_1");
//! assert_eq!(qualified_name("Game.Core", None, "Player"), "Game::Core::Player");
//! assert_eq!(qualified_name("", None, "Program"), "_::Program");
//!
//! let ids = unique_ids(&[("Foo", 1), ("Foo", 1), ("Bar", 0)]);
//! assert_eq!(ids, ["Foo_1_1", "Foo_1_2", "Bar_0"]);
//! ```

use std::collections::HashMap;

use crate::{
    metadata::typedesc::TypeKind,
    typegraph::{
        class::ResolvedClass,
        types::{ClassId, ResolvedType, TypeId, TypeInterner},
    },
};

/// Replaces every character outside `[A-Za-z0-9_]` with `_`, and prefixes a leading digit.
#[must_use]
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if out.is_empty() {
        out.push('_');
    } else if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Removes the generic arity marker: `Dictionary`2` becomes `Dictionary`.
#[must_use]
pub fn strip_arity(name: &str) -> &str {
    match name.find('`') {
        Some(position) => &name[..position],
        None => name,
    }
}

/// Builds the `::` path of a class.
///
/// `declaring` is the qualified name of the enclosing class; nested classes take the path of
/// their declaring class and ignore `namespace`.
#[must_use]
pub fn qualified_name(namespace: &str, declaring: Option<&str>, name: &str) -> String {
    let prefix = match declaring {
        Some(declaring) => declaring.to_string(),
        None if namespace.is_empty() => "_".to_string(),
        None => namespace
            .split('.')
            .map(sanitize_identifier)
            .collect::<Vec<_>>()
            .join("::"),
    };

    format!("{prefix}::{}", sanitize_identifier(name))
}

/// Renders a method signature as `[static ]<return> <name>(<type> <param>, ...)`.
#[must_use]
pub fn method_signature(
    is_static: bool,
    return_type: &str,
    name: &str,
    parameters: &[(String, String)],
) -> String {
    let parameters = parameters
        .iter()
        .map(|(ty, name)| format!("{ty} {name}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}{return_type} {name}({parameters})",
        if is_static { "static " } else { "" }
    )
}

/// Assigns unique identifiers to methods given as `(name, parameter count)` in signature order.
///
/// The base identifier is `<sanitized name>_<parameter count>`. Methods sharing a base get a
/// one-based `_<rank>` suffix in the order given; a base used once stays bare.
#[must_use]
pub fn unique_ids(methods: &[(&str, usize)]) -> Vec<String> {
    let bases: Vec<String> = methods
        .iter()
        .map(|(name, count)| format!("{}_{count}", sanitize_identifier(name)))
        .collect();

    let mut totals: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *totals.entry(base.as_str()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    bases
        .iter()
        .map(|base| {
            if totals[base.as_str()] == 1 {
                return base.clone();
            }
            let rank = seen.entry(base.as_str()).or_default();
            *rank += 1;
            format!("{base}_{rank}")
        })
        .collect()
}

/// C# keyword or framework name of a primitive kind
#[must_use]
pub fn primitive_display_name(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Void => "void",
        TypeKind::Boolean => "bool",
        TypeKind::Char => "char",
        TypeKind::I1 => "sbyte",
        TypeKind::U1 => "byte",
        TypeKind::I2 => "short",
        TypeKind::U2 => "ushort",
        TypeKind::I4 => "int",
        TypeKind::U4 => "uint",
        TypeKind::I8 => "long",
        TypeKind::U8 => "ulong",
        TypeKind::R4 => "float",
        TypeKind::R8 => "double",
        TypeKind::String => "string",
        TypeKind::Object => "object",
        TypeKind::I | TypeKind::FnPtr => "IntPtr",
        TypeKind::U => "UIntPtr",
        TypeKind::TypedByRef => "TypedReference",
        _ => "object",
    }
}

/// Native storage name of a primitive kind
#[must_use]
pub fn primitive_native_name(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Void => "void",
        TypeKind::Boolean => "un_bool",
        TypeKind::Char => "un_char",
        TypeKind::I1 => "un_sbyte",
        TypeKind::U1 => "un_byte",
        TypeKind::I2 => "un_short",
        TypeKind::U2 => "un_ushort",
        TypeKind::I4 => "un_int",
        TypeKind::U4 => "un_uint",
        TypeKind::I8 => "un_long",
        TypeKind::U8 => "un_ulong",
        TypeKind::R4 => "un_float",
        TypeKind::R8 => "un_double",
        TypeKind::String => "System_String_o*",
        TypeKind::I | TypeKind::FnPtr => "intptr_t",
        TypeKind::U => "uintptr_t",
        _ => "Il2CppObject*",
    }
}

/// Framework name of a primitive kind, used for array element names
fn primitive_system_name(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Boolean => "System_Boolean",
        TypeKind::Char => "System_Char",
        TypeKind::I1 => "System_SByte",
        TypeKind::U1 => "System_Byte",
        TypeKind::I2 => "System_Int16",
        TypeKind::U2 => "System_UInt16",
        TypeKind::I4 => "System_Int32",
        TypeKind::U4 => "System_UInt32",
        TypeKind::I8 => "System_Int64",
        TypeKind::U8 => "System_UInt64",
        TypeKind::R4 => "System_Single",
        TypeKind::R8 => "System_Double",
        TypeKind::String => "System_String",
        TypeKind::I | TypeKind::FnPtr => "System_IntPtr",
        TypeKind::U => "System_UIntPtr",
        _ => "System_Object",
    }
}

/// Renders interned types and classes.
pub struct Renderer<'g> {
    types: &'g TypeInterner,
    classes: &'g boxcar::Vec<ResolvedClass>,
}

impl<'g> Renderer<'g> {
    pub(crate) fn new(types: &'g TypeInterner, classes: &'g boxcar::Vec<ResolvedClass>) -> Self {
        Renderer { types, classes }
    }

    fn class(&self, id: ClassId) -> Option<&'g ResolvedClass> {
        self.classes.get(id.index())
    }

    /// The C# spelling of `ty`
    #[must_use]
    pub fn display(&self, ty: TypeId) -> String {
        match self.types.get(ty) {
            None => "?".to_string(),
            Some(ResolvedType::Void) => "void".to_string(),
            Some(ResolvedType::Primitive(kind)) => primitive_display_name(*kind).to_string(),
            Some(ResolvedType::Class(class)) => self.class_display(*class),
            Some(ResolvedType::Array { element, rank }) => format!(
                "{}[{}]",
                self.display(*element),
                ",".repeat(usize::from(*rank).saturating_sub(1))
            ),
            Some(ResolvedType::Pointer(element)) => format!("{}*", self.display(*element)),
            Some(ResolvedType::ByRef(element)) => format!("ref {}", self.display(*element)),
            Some(ResolvedType::GenericParameter { name, .. }) => name.clone(),
        }
    }

    /// The C# spelling of a class, without namespace: `Outer.Inner`, `List<int>`
    #[must_use]
    pub fn class_display(&self, id: ClassId) -> String {
        let Some(class) = self.class(id) else {
            return "?".to_string();
        };

        let mut out = match class.declaring {
            Some(declaring) => format!("{}.", self.class_display(declaring)),
            None => String::new(),
        };
        out.push_str(strip_arity(&class.name));
        if !class.generic_args.is_empty() {
            let args: Vec<String> = class.generic_args.iter().map(|&arg| self.display(arg)).collect();
            out.push('<');
            out.push_str(&args.join(", "));
            out.push('>');
        }
        out
    }

    /// The C# spelling of a class with its namespace: `Game.Core.Outer.Inner`
    #[must_use]
    pub fn class_full_display(&self, id: ClassId) -> String {
        let Some(class) = self.class(id) else {
            return "?".to_string();
        };

        if class.namespace.is_empty() {
            self.class_display(id)
        } else {
            format!("{}.{}", class.namespace, self.class_display(id))
        }
    }

    /// The native storage name of `ty`
    #[must_use]
    pub fn native(&self, ty: TypeId) -> String {
        match self.types.get(ty) {
            None => "void*".to_string(),
            Some(ResolvedType::Void) => "void".to_string(),
            Some(ResolvedType::Primitive(kind)) => primitive_native_name(*kind).to_string(),
            Some(ResolvedType::Class(class)) => self.class_native(*class),
            Some(ResolvedType::Array { element, .. }) => {
                format!("{}_array*", self.native_element(*element))
            }
            Some(ResolvedType::Pointer(element) | ResolvedType::ByRef(element)) => {
                let element = self.native(*element);
                if element == "void" {
                    "void*".to_string()
                } else {
                    format!("{element}*")
                }
            }
            Some(ResolvedType::GenericParameter { .. }) => "Il2CppObject*".to_string(),
        }
    }

    /// The native storage name of a class-typed value
    #[must_use]
    pub fn class_native(&self, id: ClassId) -> String {
        let Some(class) = self.class(id) else {
            return "Il2CppObject*".to_string();
        };

        if class.is_enum {
            return match class.underlying() {
                Some(underlying) => self.native(underlying),
                None => primitive_native_name(TypeKind::I4).to_string(),
            };
        }

        let base = format!("{}_o", sanitize_identifier(&self.class_full_display(id)));
        if class.is_valuetype {
            base
        } else {
            format!("{base}*")
        }
    }

    fn native_element(&self, ty: TypeId) -> String {
        match self.types.get(ty) {
            Some(ResolvedType::Primitive(kind)) => primitive_system_name(*kind).to_string(),
            Some(ResolvedType::Class(class)) => sanitize_identifier(&self.class_full_display(*class)),
            Some(ResolvedType::Array { element, .. }) => {
                format!("{}_array", self.native_element(*element))
            }
            _ => "Il2CppObject".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize() {
        assert_eq!(sanitize_identifier("Player"), "Player");
        assert_eq!(sanitize_identifier("<Start>d__4"), "_Start_d__4");
        assert_eq!(sanitize_identifier("2D"), "_2D");
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("Dictionary`2"), "Dictionary_2");
    }

    #[test]
    fn qualified() {
        let outer = qualified_name("Game.Core", None, "Outer");
        assert_eq!(outer, "Game::Core::Outer");
        assert_eq!(
            qualified_name("", Some(&outer), "Inner"),
            "Game::Core::Outer::Inner"
        );
        assert_eq!(qualified_name("", None, "Program"), "_::Program");
        assert_eq!(qualified_name("My-Lib", None, "List`1"), "My_Lib::List_1");
    }

    #[test]
    fn signatures() {
        let params = vec![("int".to_string(), "a".to_string()), ("string".to_string(), "b".to_string())];
        assert_eq!(
            method_signature(true, "void", "Foo", &params),
            "static void Foo(int a, string b)"
        );
        assert_eq!(method_signature(false, "int", "Get", &[]), "int Get()");
    }

    #[test]
    fn unique_identifiers() {
        // Already in signature order
        let ids = unique_ids(&[("Foo", 1), ("Foo", 1), ("Foo", 2), (".ctor", 0)]);
        assert_eq!(ids, ["Foo_1_1", "Foo_1_2", "Foo_2", "_ctor_0"]);
    }

    #[test]
    fn arity() {
        assert_eq!(strip_arity("List`1"), "List");
        assert_eq!(strip_arity("Plain"), "Plain");
    }
}
