use crate::expr::RuntimeError;
use crate::identifier::Identifier;
use crate::value::Val;
use rustc_hash::FxHashMap;
use std::{
    fmt,
    io::{self, BufRead},
    rc::Rc,
    time::{self, Duration},
};
use tracing::{trace, warn};

/// Module name under which host functions are imported: `import print from Native;`.
pub const NATIVE_MODULE_NAME: &str = "Native";

pub type NativeImpl = Rc<dyn Fn(&[Val]) -> Val>;

/// A function implemented by the host rather than in script code.
#[derive(Clone)]
pub struct NativeCall {
    name: Identifier,
    arity: usize,
    implementation: NativeImpl,
}

impl NativeCall {
    pub fn new(name: Identifier, arity: usize, implementation: impl Fn(&[Val]) -> Val + 'static) -> Self {
        NativeCall {
            name,
            arity,
            implementation: Rc::new(implementation),
        }
    }

    pub fn name(&self) -> &Identifier {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, vals: &[Val]) -> Result<Val, RuntimeError> {
        if self.arity != vals.len() {
            return Err(RuntimeError::ArityMismatch {
                expected_num_args: self.arity,
                actual_num_args: vals.len(),
            });
        }
        trace!(native = %self.name, "calling native function");
        Ok((self.implementation)(vals))
    }
}

impl fmt::Debug for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCall")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// The table of host functions a program may import from [`NATIVE_MODULE_NAME`].
#[derive(Debug, Clone, Default)]
pub struct NativeFunctions {
    table: FxHashMap<Identifier, NativeCall>,
}

impl NativeFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name`, replacing any earlier function of that name.
    pub fn register(
        &mut self,
        name: &str,
        arity: usize,
        implementation: impl Fn(&[Val]) -> Val + 'static,
    ) -> &mut Self {
        let name = Identifier::from(name);
        self.table
            .insert(name.clone(), NativeCall::new(name, arity, implementation));
        self
    }

    pub fn get(&self, name: &Identifier) -> Option<&NativeCall> {
        self.table.get(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// `clock`, `print`, `parseNum` and `readString`, wired to the process's
    /// clock and standard streams.
    pub fn standard() -> Self {
        let mut natives = Self::new();
        natives
            .register("clock", 0, |_| clock())
            .register("print", 1, |vals| {
                println!("{}", vals[0]);
                Val::Null
            })
            .register("parseNum", 1, |vals| parse_num(&vals[0]))
            .register("readString", 0, |_| read_string());
        natives
    }
}

fn clock() -> Val {
    Val::Num(
        time::SystemTime::now()
            .duration_since(time::UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64(),
    )
}

/// `{ success: true, value: n }` for a numeric string, `{ success: false }` otherwise.
pub fn parse_num(val: &Val) -> Val {
    let parsed = match val {
        Val::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) => Val::object([
            (Identifier::from("success"), Val::Bool(true)),
            (Identifier::from("value"), Val::Num(n)),
        ]),
        None => Val::object([(Identifier::from("success"), Val::Bool(false))]),
    }
}

fn read_string() -> Val {
    let mut line = String::new();
    if let Err(err) = io::stdin().lock().read_line(&mut line) {
        warn!(%err, "readString failed, returning an empty string");
        line.clear();
    }
    let trimmed = line.trim_end_matches(['\n', '\r']);
    Val::string(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn arity_is_checked_before_calling() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let call = NativeCall::new("tick".into(), 0, move |_| {
            counter.set(counter.get() + 1);
            Val::Null
        });

        let err = call.call(&[Val::Num(1.0)]).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ArityMismatch { expected_num_args: 0, actual_num_args: 1 }
        ));
        assert_eq!(calls.get(), 0);

        call.call(&[]).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn parse_num_reports_success() {
        let Val::Object(fields) = parse_num(&Val::string("12.5")) else {
            panic!("parseNum must return an object");
        };
        let fields = fields.borrow();
        assert_eq!(fields.get(&"success".into()), Some(&Val::Bool(true)));
        assert_eq!(fields.get(&"value".into()), Some(&Val::Num(12.5)));
    }

    #[test]
    fn parse_num_rejects_garbage_and_non_strings() {
        for input in [Val::string("twelve"), Val::Num(3.0)] {
            let Val::Object(fields) = parse_num(&input) else {
                panic!("parseNum must return an object");
            };
            let fields = fields.borrow();
            assert_eq!(fields.get(&"success".into()), Some(&Val::Bool(false)));
            assert!(fields.get(&"value".into()).is_none());
        }
    }

    #[test]
    fn standard_table_has_the_four_natives() {
        let natives = NativeFunctions::standard();
        for (name, arity) in [("clock", 0), ("print", 1), ("parseNum", 1), ("readString", 0)] {
            assert_eq!(natives.get(&name.into()).map(NativeCall::arity), Some(arity), "{name}");
        }
        assert_eq!(natives.len(), 4);
    }
}
