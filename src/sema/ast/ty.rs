use std::fmt::Display;

use crate::StringId;

/// Handle into the [`TyTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TyId(u32);

impl TyId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle into the [`ClassTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClassId(u32);

impl ClassId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The slice of the host type system the engine needs.  `const` is carried as
/// a qualifier flag on the table entry rather than a wrapper type so that
/// stripping qualification never allocates.
#[derive(Clone, Debug, PartialEq)]
pub enum Ty {
    Int,
    UInt,
    Float,
    Bool,
    Pointer(TyId),
    Array(TyId, usize),
    Reference(TyId),
    Class(ClassId),
    /// A class type usable as a random-access iterator: assignment,
    /// comparison and increment are overloadable and a distance computation
    /// exists for it.
    Iterator(ClassId),
    /// A class type that has been declared but not defined.
    Incomplete(ClassId),
    /// A template-dependent type; all analysis of it is deferred.
    Dependent,
}

/// Availability of one special member function of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberFn {
    Available,
    Deleted,
    Inaccessible,
    Missing,
}

impl MemberFn {
    /// A member is usable when it exists, is accessible, and is not deleted.
    pub fn is_usable(self) -> bool {
        self == MemberFn::Available
    }
}

/// Which special member a clause requires; used to parameterize the
/// required-method diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialMember {
    DefaultConstructor,
    CopyConstructor,
    CopyAssignment,
    Destructor,
}

impl Display for SpecialMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecialMember::DefaultConstructor => f.write_str("default constructor"),
            SpecialMember::CopyConstructor => f.write_str("copy constructor"),
            SpecialMember::CopyAssignment => f.write_str("copy assignment operator"),
            SpecialMember::Destructor => f.write_str("destructor"),
        }
    }
}

/// Host facts about one class type.
#[derive(Clone, Debug)]
pub struct ClassInfo {
    pub name: StringId,
    pub default_ctor: MemberFn,
    pub copy_ctor: MemberFn,
    pub copy_assign: MemberFn,
    pub dtor: MemberFn,
    pub has_mutable_fields: bool,
    pub trivially_copyable: bool,
    /// Direct and indirect base classes, for derived-to-base combiner
    /// matching.
    pub bases: Vec<ClassId>,
    /// Result types of the class's implicit conversion functions, used for
    /// contextual integral conversion of clause arguments.
    pub conversions: Vec<TyId>,
    pub decl_span: crate::sema::Span,
}

#[derive(Debug, Default)]
pub struct ClassTable {
    classes: Vec<ClassInfo>,
}

impl ClassTable {
    pub fn new() -> ClassTable {
        ClassTable { classes: vec![] }
    }

    pub fn add(&mut self, info: ClassInfo) -> ClassId {
        self.classes.push(info);
        ClassId(self.classes.len() as u32 - 1)
    }

    pub fn get(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.index()]
    }

    pub fn member(&self, id: ClassId, which: SpecialMember) -> MemberFn {
        let info = self.get(id);
        match which {
            SpecialMember::DefaultConstructor => info.default_ctor,
            SpecialMember::CopyConstructor => info.copy_ctor,
            SpecialMember::CopyAssignment => info.copy_assign,
            SpecialMember::Destructor => info.dtor,
        }
    }

    /// Whether `derived` is `base` or inherits from it, directly or through
    /// intermediate bases.
    pub fn is_derived_from(&self, derived: ClassId, base: ClassId) -> bool {
        if derived == base {
            return true;
        }
        self.get(derived)
            .bases
            .iter()
            .any(|b| self.is_derived_from(*b, base))
    }
}

/// An interning table for the types the engine manipulates.  Entries pair the
/// structural type with a `const` qualifier bit.
#[derive(Debug, Default)]
pub struct TyTable {
    types: Vec<(Ty, bool)>,
}

impl TyTable {
    pub fn new() -> TyTable {
        TyTable { types: vec![] }
    }

    pub fn add(&mut self, ty: Ty) -> TyId {
        self.intern(ty, false)
    }

    pub fn add_const(&mut self, ty: Ty) -> TyId {
        self.intern(ty, true)
    }

    fn intern(&mut self, ty: Ty, is_const: bool) -> TyId {
        if let Some(i) = self
            .types
            .iter()
            .position(|(t, c)| *t == ty && *c == is_const)
        {
            return TyId(i as u32);
        }
        self.types.push((ty, is_const));
        TyId(self.types.len() as u32 - 1)
    }

    pub fn get(&self, id: TyId) -> &Ty {
        &self.types[id.index()].0
    }

    pub fn is_const(&self, id: TyId) -> bool {
        self.types[id.index()].1
    }

    /// Strips reference wrappers, yielding the referred-to type.
    pub fn non_reference(&self, id: TyId) -> TyId {
        match self.get(id) {
            Ty::Reference(inner) => self.non_reference(*inner),
            _ => id,
        }
    }

    /// Iterates array types down to their element type, stripping references
    /// along the way.  Class-typed operand checks run against the result.
    pub fn array_element(&self, id: TyId) -> TyId {
        let id = self.non_reference(id);
        match self.get(id) {
            Ty::Array(elem, _) => self.array_element(*elem),
            _ => id,
        }
    }

    pub fn is_reference(&self, id: TyId) -> bool {
        matches!(self.get(id), Ty::Reference(_))
    }

    pub fn is_array(&self, id: TyId) -> bool {
        matches!(self.get(self.non_reference(id)), Ty::Array(..))
    }

    pub fn is_integer(&self, id: TyId) -> bool {
        matches!(self.get(self.non_reference(id)), Ty::Int | Ty::UInt | Ty::Bool)
    }

    pub fn is_signed_integer(&self, id: TyId) -> bool {
        matches!(self.get(self.non_reference(id)), Ty::Int)
    }

    pub fn is_pointer(&self, id: TyId) -> bool {
        matches!(self.get(self.non_reference(id)), Ty::Pointer(_))
    }

    pub fn is_floating(&self, id: TyId) -> bool {
        matches!(self.get(self.non_reference(id)), Ty::Float)
    }

    pub fn is_arithmetic(&self, id: TyId) -> bool {
        self.is_integer(id) || self.is_floating(id)
    }

    /// Scalar types: arithmetic and pointer types.
    pub fn is_scalar(&self, id: TyId) -> bool {
        self.is_arithmetic(id) || self.is_pointer(id)
    }

    pub fn is_dependent(&self, id: TyId) -> bool {
        matches!(self.get(id), Ty::Dependent)
    }

    pub fn is_incomplete(&self, id: TyId) -> bool {
        matches!(self.get(self.non_reference(id)), Ty::Incomplete(_))
    }

    /// The class behind a class or iterator type, if any.
    pub fn as_class(&self, id: TyId) -> Option<ClassId> {
        match self.get(self.non_reference(id)) {
            Ty::Class(c) | Ty::Iterator(c) | Ty::Incomplete(c) => Some(*c),
            _ => None,
        }
    }

    /// Overloadable types may serve as loop induction variables in C++.
    pub fn is_overloadable(&self, id: TyId) -> bool {
        matches!(self.get(self.non_reference(id)), Ty::Iterator(_))
    }

    /// Same unqualified canonical type: reference stripped, constness
    /// ignored.
    pub fn same_unqualified(&self, a: TyId, b: TyId) -> bool {
        self.get(self.non_reference(a)) == self.get(self.non_reference(b))
    }

    /// The same structural type with the `const` qualifier removed;
    /// synthesized pseudo variables are always declared unqualified.
    pub fn unqualified(&mut self, id: TyId) -> TyId {
        let ty = self.get(id).clone();
        self.intern(ty, false)
    }
}
