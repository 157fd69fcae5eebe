//! Arena of the classes, methods and variables a program declares.
//!
//! Entities own their members through id lists; parent links are plain ids
//! used only for upward lookup. One table is built per parse and handed to
//! the interpreter, which only reads it and updates variable values.

use std::fmt;

use crate::value::Value;

mod error;

pub use error::ScopeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(usize);

/// Identifies one method body; ids are handed out in parse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Class,
    Method,
    Variable,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Class => "class",
            EntityKind::Method => "method",
            EntityKind::Variable => "variable",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Class(ClassId),
    Method(MethodId),
    Variable(VariableId),
}

impl Entity {
    pub fn kind(self) -> EntityKind {
        match self {
            Entity::Class(_) => EntityKind::Class,
            Entity::Method(_) => EntityKind::Method,
            Entity::Variable(_) => EntityKind::Variable,
        }
    }
}

/// Position in the scope tree: the innermost class and method being
/// parsed or executed. Callers save a copy before descending and put it
/// back afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub class: Option<ClassId>,
    pub method: Option<MethodId>,
}

impl Cursor {
    pub const GLOBAL: Cursor = Cursor {
        class: None,
        method: None,
    };

    pub fn in_class(class: ClassId) -> Self {
        Self {
            class: Some(class),
            method: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Members {
    pub classes: Vec<ClassId>,
    pub methods: Vec<MethodId>,
    pub variables: Vec<VariableId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: String,
    pub parent: Option<ClassId>,
    pub members: Members,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub return_type: String,
    pub parameter_types: Vec<String>,
    pub parent_class: Option<ClassId>,
    pub parent_method: Option<MethodId>,
    /// Nested methods and variables; `members.classes` stays empty.
    pub members: Members,
    /// Bodies in declaration order; overload resolution tries them in this order.
    pub implementations: Vec<BodyId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: Option<Value>,
    pub parent_class: Option<ClassId>,
    pub parent_method: Option<MethodId>,
}

#[derive(Debug, Clone, Copy)]
enum Owner {
    Global,
    Class(ClassId),
    Method(MethodId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeTable {
    classes: Vec<Class>,
    methods: Vec<Method>,
    variables: Vec<Variable>,
    global: Members,
    body_count: usize,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &Members {
        &self.global
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn body_count(&self) -> usize {
        self.body_count
    }

    /// Registers a class under the cursor's class, or globally.
    pub fn declare_class(&mut self, name: &str, cursor: Cursor) -> Result<ClassId, ScopeError> {
        let owner = cursor.class.map_or(Owner::Global, Owner::Class);
        self.ensure_unique(owner, name, EntityKind::Class)?;

        let id = ClassId(self.classes.len());
        self.classes.push(Class {
            name: name.to_string(),
            parent: cursor.class,
            members: Members::default(),
        });
        self.members_mut(owner).classes.push(id);
        Ok(id)
    }

    /// Registers a method signature in the innermost method, else class, else globally.
    pub fn declare_method(
        &mut self,
        name: &str,
        return_type: &str,
        parameter_types: &[String],
        cursor: Cursor,
    ) -> Result<MethodId, ScopeError> {
        let owner = Self::declaring_owner(cursor);
        self.ensure_unique(owner, name, EntityKind::Method)?;

        let id = MethodId(self.methods.len());
        self.methods.push(Method {
            name: name.to_string(),
            return_type: return_type.to_string(),
            parameter_types: parameter_types.to_vec(),
            parent_class: cursor.class,
            parent_method: cursor.method,
            members: Members::default(),
            implementations: Vec::new(),
        });
        self.members_mut(owner).methods.push(id);
        Ok(id)
    }

    /// Registers a variable in the innermost method, else class, else globally.
    pub fn declare_variable(
        &mut self,
        name: &str,
        cursor: Cursor,
    ) -> Result<VariableId, ScopeError> {
        let owner = Self::declaring_owner(cursor);
        self.ensure_unique(owner, name, EntityKind::Variable)?;
        Ok(self.push_variable(owner, name, cursor))
    }

    /// Returns the method's own variable for a parameter name, creating it on
    /// first use. Overloads of one method share these variables.
    pub fn bind_parameter(&mut self, method: MethodId, name: &str) -> VariableId {
        let owner = Owner::Method(method);
        if let Some(Entity::Variable(id)) =
            self.find_in(owner, name, Some(EntityKind::Variable))
        {
            return id;
        }
        let cursor = self.body_cursor(method);
        self.push_variable(owner, name, cursor)
    }

    pub fn add_implementation(&mut self, method: MethodId) -> BodyId {
        let id = BodyId(self.body_count);
        self.body_count += 1;
        self.methods[method.0].implementations.push(id);
        id
    }

    /// Cursor in effect inside a body of `method`.
    pub fn body_cursor(&self, method: MethodId) -> Cursor {
        Cursor {
            class: self.method(method).parent_class,
            method: Some(method),
        }
    }

    /// Looks a name up through the method chain, then the class, then the
    /// global scope. Within one scope variables win over methods over classes.
    pub fn resolve(&self, name: &str, cursor: Cursor) -> Option<Entity> {
        self.resolve_kind(name, cursor, None)
    }

    pub fn resolve_method(&self, name: &str, cursor: Cursor) -> Option<MethodId> {
        match self.resolve_kind(name, cursor, Some(EntityKind::Method)) {
            Some(Entity::Method(id)) => Some(id),
            _ => None,
        }
    }

    /// Finds a class declared directly in the cursor's class, or globally.
    pub fn find_class(&self, name: &str, cursor: Cursor) -> Option<ClassId> {
        let owner = cursor.class.map_or(Owner::Global, Owner::Class);
        match self.find_in(owner, name, Some(EntityKind::Class)) {
            Some(Entity::Class(id)) => Some(id),
            _ => None,
        }
    }

    /// Finds a method declared directly in the scope a declaration at
    /// `cursor` would have registered it in.
    pub fn find_declared_method(&self, name: &str, cursor: Cursor) -> Option<MethodId> {
        match self.find_in(Self::declaring_owner(cursor), name, Some(EntityKind::Method)) {
            Some(Entity::Method(id)) => Some(id),
            _ => None,
        }
    }

    pub fn find_declared_variable(&self, name: &str, cursor: Cursor) -> Option<VariableId> {
        match self.find_in(Self::declaring_owner(cursor), name, Some(EntityKind::Variable)) {
            Some(Entity::Variable(id)) => Some(id),
            _ => None,
        }
    }

    pub fn value(&self, id: VariableId) -> Option<&Value> {
        self.variables[id.0].value.as_ref()
    }

    /// Replaces a variable's value, returning the previous one.
    pub fn set_value(&mut self, id: VariableId, value: Option<Value>) -> Option<Value> {
        std::mem::replace(&mut self.variables[id.0].value, value)
    }

    fn resolve_kind(&self, name: &str, cursor: Cursor, kind: Option<EntityKind>) -> Option<Entity> {
        let methods = std::iter::successors(cursor.method, |id| self.method(*id).parent_method)
            .map(Owner::Method);
        methods
            .chain(cursor.class.map(Owner::Class))
            .chain(std::iter::once(Owner::Global))
            .find_map(|owner| self.find_in(owner, name, kind))
    }

    fn find_in(&self, owner: Owner, name: &str, kind: Option<EntityKind>) -> Option<Entity> {
        let members = self.members(owner);
        let wants = |candidate: EntityKind| kind.is_none_or(|kind| kind == candidate);

        if wants(EntityKind::Variable)
            && let Some(&id) = members
                .variables
                .iter()
                .find(|id| self.variable(**id).name == name)
        {
            return Some(Entity::Variable(id));
        }
        if wants(EntityKind::Method)
            && let Some(&id) = members
                .methods
                .iter()
                .find(|id| self.method(**id).name == name)
        {
            return Some(Entity::Method(id));
        }
        if wants(EntityKind::Class)
            && let Some(&id) = members
                .classes
                .iter()
                .find(|id| self.class(**id).name == name)
        {
            return Some(Entity::Class(id));
        }
        None
    }

    fn ensure_unique(&self, owner: Owner, name: &str, kind: EntityKind) -> Result<(), ScopeError> {
        if self.find_in(owner, name, Some(kind)).is_some() {
            return Err(ScopeError::DuplicateDeclaration {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn push_variable(&mut self, owner: Owner, name: &str, cursor: Cursor) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            value: None,
            parent_class: cursor.class,
            parent_method: cursor.method,
        });
        self.members_mut(owner).variables.push(id);
        id
    }

    fn declaring_owner(cursor: Cursor) -> Owner {
        match (cursor.method, cursor.class) {
            (Some(method), _) => Owner::Method(method),
            (None, Some(class)) => Owner::Class(class),
            (None, None) => Owner::Global,
        }
    }

    fn members(&self, owner: Owner) -> &Members {
        match owner {
            Owner::Global => &self.global,
            Owner::Class(id) => &self.classes[id.0].members,
            Owner::Method(id) => &self.methods[id.0].members,
        }
    }

    fn members_mut(&mut self, owner: Owner) -> &mut Members {
        match owner {
            Owner::Global => &mut self.global,
            Owner::Class(id) => &mut self.classes[id.0].members,
            Owner::Method(id) => &mut self.methods[id.0].members,
        }
    }
}
