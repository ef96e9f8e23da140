use crate::expr::RuntimeError;
use crate::identifier::Identifier;
use crate::native::NativeCall;
use crate::scope::ScopeLink;
use crate::statement::Block;
use rustc_hash::{FxHashMap, FxHashSet};
use std::{cell::RefCell, fmt, rc::Rc};

pub type Fields = FxHashMap<Identifier, Val>;
pub type ObjectRef = Rc<RefCell<Fields>>;

type ObjectPtr = *const RefCell<Fields>;

/// A user-defined function together with the scope it was declared in.
pub struct Func {
    pub arg_names: Rc<[Identifier]>,
    pub body: Rc<Block>,
    pub scope: ScopeLink,
}

impl Func {
    pub fn arity(&self) -> usize {
        self.arg_names.len()
    }
}

// The captured scope usually contains this very function, so it is left out.
impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("arg_names", &self.arg_names)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Val {
    Num(f64),
    Bool(bool),
    String(Rc<str>),
    Null,
    Object(ObjectRef),
    Closure(Rc<Func>),
    NativeFunc(NativeCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Boolean,
    String,
    Null,
    Object,
    Closure,
    NativeFunc,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Null => "null",
            Self::Object => "object",
            Self::Closure => "closure",
            Self::NativeFunc => "nativeFunc",
        })
    }
}

impl Val {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Num(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Boolean,
            Self::String(_) => ValueKind::String,
            Self::Null => ValueKind::Null,
            Self::Object(_) => ValueKind::Object,
            Self::Closure(_) => ValueKind::Closure,
            Self::NativeFunc(_) => ValueKind::NativeFunc,
        }
    }

    pub fn object(fields: impl IntoIterator<Item = (Identifier, Val)>) -> Val {
        Val::Object(Rc::new(RefCell::new(fields.into_iter().collect())))
    }

    pub fn string(s: &str) -> Val {
        Val::String(s.into())
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Closure(_) | Self::NativeFunc(_))
    }

    /// The `==` operator. `/=` is its negation.
    ///
    /// Functions can't be compared at all, and apart from `null` both sides must
    /// be of the same kind.
    pub fn language_eq(&self, other: &Val) -> Result<bool, RuntimeError> {
        self.eq_tracking(other, &mut FxHashSet::default())
    }

    // `in_progress` holds the object pairs being compared further up. Meeting
    // one again means both graphs loop back the same way, which counts as equal.
    fn eq_tracking(
        &self,
        other: &Val,
        in_progress: &mut FxHashSet<(ObjectPtr, ObjectPtr)>,
    ) -> Result<bool, RuntimeError> {
        if let Some(func) = [self, other].into_iter().find(|v| v.is_callable()) {
            return Err(RuntimeError::TypeMismatch {
                expected_types: vec![ValueKind::Boolean, ValueKind::Number],
                actual_type: func.kind(),
            });
        }

        match (self, other) {
            (Self::Null, Self::Null) => Ok(true),
            (Self::Null, _) | (_, Self::Null) => Ok(false),
            (Self::Num(a), Self::Num(b)) => Ok(a == b),
            (Self::Bool(a), Self::Bool(b)) => Ok(a == b),
            (Self::String(a), Self::String(b)) => Ok(a == b),
            (Self::Object(a), Self::Object(b)) => {
                let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
                if !in_progress.insert(pair) {
                    return Ok(true);
                }
                let res = fields_eq(&a.borrow(), &b.borrow(), in_progress);
                in_progress.remove(&pair);
                res
            }
            (l, r) => Err(RuntimeError::TypeMismatch {
                expected_types: vec![l.kind()],
                actual_type: r.kind(),
            }),
        }
    }

    fn write_tracking(&self, f: &mut fmt::Formatter, printing: &mut FxHashSet<ObjectPtr>) -> fmt::Result {
        match self {
            Self::String(x) => write!(f, "{}", x),
            Self::Num(x) => write!(f, "{}", x),
            Self::Bool(x) => write!(f, "{}", x),
            Self::Null => write!(f, "null"),
            Self::Object(fields) => {
                let ptr = Rc::as_ptr(fields);
                if !printing.insert(ptr) {
                    return write!(f, "{{...}}");
                }
                let fields = fields.borrow();
                if fields.is_empty() {
                    printing.remove(&ptr);
                    return write!(f, "{{}}");
                }
                let mut sorted = fields.iter().collect::<Vec<_>>();
                sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
                write!(f, "{{ ")?;
                for (i, (name, val)) in sorted.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: ")?;
                    val.write_tracking(f, printing)?;
                }
                printing.remove(&ptr);
                write!(f, " }}")
            }
            Self::Closure(_) => write!(f, "<closure>"),
            Self::NativeFunc(nc) => write!(f, "<native function {}>", nc.name()),
        }
    }
}

fn fields_eq(
    a: &Fields,
    b: &Fields,
    in_progress: &mut FxHashSet<(ObjectPtr, ObjectPtr)>,
) -> Result<bool, RuntimeError> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (field, left) in a.iter() {
        let Some(right) = b.get(field) else {
            return Ok(false);
        };
        if !left.eq_tracking(right, in_progress)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Host-side equality: structural for data, identity for functions.
impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Null, Self::Null) => true,
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            (Self::NativeFunc(a), Self::NativeFunc(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

impl From<f64> for Val {
    fn from(value: f64) -> Self {
        Val::Num(value)
    }
}

impl From<bool> for Val {
    fn from(value: bool) -> Self {
        Val::Bool(value)
    }
}

/// Objects print with their fields sorted by name. An object reached again
/// while it is still being printed shows as `{...}`.
impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_tracking(f, &mut FxHashSet::default())
    }
}
